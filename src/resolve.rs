//! Label resolution and branch/call relaxation.
//!
//! Runs four phases over a preprocessed [`Program`]:
//!
//! 1. **Index** label declarations (`.name` on a line of its own), bind each to
//!    the next instruction line and delete the declaration.
//! 2. **Expand** every label reference into a `MOVIL`/`MOVIU` pair that loads
//!    the label address into a register. `MOV rd .label` becomes the pair
//!    alone; `J[cond] .label$rl` and `CALL .label$rl` become the pair followed
//!    by the register form using the loading register `rl`.
//! 3. **Relax** each expanded jump/call whose target is within the range of
//!    the matching `B[cond]`/`CALLD` displacement into that single instruction.
//! 4. **Materialize** the low/high address bytes of every remaining pair.
//!
//! Label addresses are never cached: they are read from the program each time
//! they are needed, since every collapse shifts the lines after it.

use crate::config::AsmConfig;
use crate::error::{AsmError, Diagnostic, Result};
use crate::instructions::{lookup, Format, InstrDesc, MOV, MOVIL, MOVIU};
use crate::line::{Line, LineId, Program};
use crate::registers::{Register, R0};
use serde::Serialize;
use std::collections::HashMap;
use tracing::{debug, trace};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Label {
    /// Includes the label prefix, as written in references.
    name: String,
    target: LineId,
    /// Line of the declaration.
    source_line: usize,
    uses: usize,
}

/// Final address of a label.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Symbol {
    pub name: String,
    pub address: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RefState {
    /// `MOVIL`/`MOVIU` pair with the label name as placeholder immediate.
    Expanded,
    /// Collapsed into a single displacement instruction.
    Relaxed,
    /// Pair carrying the resolved address bytes.
    Materialized,
}

#[derive(Debug, Clone, Copy)]
struct Transfer {
    line: LineId,
    short: &'static InstrDesc,
}

#[derive(Debug, Clone, Copy)]
struct Reference {
    label: usize,
    low: LineId,
    high: LineId,
    transfer: Option<Transfer>,
    state: RefState,
}

#[derive(Debug, Default)]
pub struct Resolution {
    pub symbols: Vec<Symbol>,
    pub diagnostics: Vec<Diagnostic>,
    pub expanded: usize,
    pub relaxed: usize,
}

/// Runs all phases on `program` in place.
pub fn resolve(program: &mut Program, cfg: &AsmConfig) -> Result<Resolution> {
    let mut r = Resolver::new(program, cfg);
    r.index_labels()?;
    r.expand_references()?;
    r.relax()?;
    r.materialize()?;
    r.finish()
}

struct Resolver<'a> {
    program: &'a mut Program,
    cfg: &'a AsmConfig,
    labels: Vec<Label>,
    by_name: HashMap<String, usize>,
    refs: Vec<Reference>,
}

enum Role {
    Move,
    Transfer(&'static InstrDesc),
}

struct Found {
    token: usize,
    label: usize,
    loading: Option<Register>,
}

impl<'a> Resolver<'a> {
    fn new(program: &'a mut Program, cfg: &'a AsmConfig) -> Self {
        Self {
            program,
            cfg,
            labels: Vec::new(),
            by_name: HashMap::new(),
            refs: Vec::new(),
        }
    }

    fn is_label(&self, token: &str) -> bool {
        token.starts_with(&self.cfg.label_prefix)
    }

    fn index_labels(&mut self) -> Result<()> {
        let prefix = &self.cfg.label_prefix;
        // Declarations waiting for the next instruction line.
        let mut pending: Vec<(String, usize)> = Vec::new();
        let ids: Vec<LineId> = self.program.ids().collect();
        for id in ids {
            let line = self.program.line(id);
            let first = line.first();
            if !first.starts_with(prefix.as_str()) {
                for (name, source_line) in pending.drain(..) {
                    self.by_name.insert(name.clone(), self.labels.len());
                    self.labels.push(Label {
                        name,
                        target: id,
                        source_line,
                        uses: 0,
                    });
                }
                continue;
            }

            if line.tokens.len() != 1 {
                return Err(AsmError::preprocess(
                    format!("{prefix}label must contain one word per line. Got: {line}"),
                    line.source_line,
                ));
            }
            if first.len() <= prefix.len() {
                return Err(AsmError::preprocess(
                    format!("{prefix}label must contain a name. Got: {line}"),
                    line.source_line,
                ));
            }
            if self.by_name.contains_key(first) || pending.iter().any(|(n, _)| n == first) {
                return Err(AsmError::preprocess(
                    format!("{first} already exists."),
                    line.source_line,
                ));
            }
            pending.push((first.to_string(), line.source_line));
        }

        if let Some((name, source_line)) = pending.first() {
            return Err(AsmError::layout(
                format!(
                    "Cannot get address for label: {name}. An instruction or number must come after a label."
                ),
                *source_line,
            ));
        }

        let prefix = prefix.clone();
        self.program.retain(|l| !l.first().starts_with(prefix.as_str()));
        debug!(labels = self.labels.len(), "indexed labels");
        Ok(())
    }

    /// Locates the single label reference on `line`, if any.
    fn find_reference(&self, line: &Line) -> Result<Option<Found>> {
        let mut found: Option<Found> = None;
        for (i, token) in line.tokens.iter().enumerate() {
            if !self.is_label(token) {
                continue;
            }
            if found.is_some() {
                return Err(AsmError::reference(
                    "Only one label reference per line is allowed.",
                    line.source_line,
                ));
            }
            let parts: Vec<&str> = token.split(self.cfg.loading_register_separator).collect();
            if parts.len() > 2 {
                return Err(AsmError::reference(
                    format!(
                        "A label reference can only contain a label or a label and a loading register. Got: {token}"
                    ),
                    line.source_line,
                ));
            }
            let label = *self.by_name.get(parts[0]).ok_or_else(|| {
                AsmError::reference(format!("Undefined label reference: {token}"), line.source_line)
            })?;
            let loading = parts
                .get(1)
                .map(|r| Register::parse(r))
                .transpose()
                .map_err(|e| AsmError::grammar(e, line.source_line))?;
            found = Some(Found { token: i, label, loading });
        }
        Ok(found)
    }

    fn role(desc: &'static InstrDesc) -> Option<Role> {
        match desc.format {
            Format::Jump(_) | Format::Call => desc.short_form().map(|_| Role::Transfer(desc)),
            _ if desc.mnemonic == MOV => Some(Role::Move),
            _ => None,
        }
    }

    fn expand_references(&mut self) -> Result<()> {
        let mut pos = 0;
        while let Some(id) = self.program.id_at(pos) {
            let line = self.program.line(id).clone();
            let Some(found) = self.find_reference(&line)? else {
                pos += 1;
                continue;
            };
            let sl = line.source_line;

            let desc = lookup(line.first()).ok_or_else(|| {
                AsmError::reference(format!("Unknown instruction with label: {line}"), sl)
            })?;

            // Surface operand errors before rewriting anything.
            let mut probe = line.tokens.clone();
            probe[found.token] = R0.name().to_string();
            desc.parse(&probe).map_err(|e| AsmError::grammar(e, sl))?;

            let name = self.labels[found.label].name.clone();
            let (dest, transfer) = match Self::role(desc) {
                Some(Role::Move) => {
                    let rd = Register::parse(&line.tokens[1]).map_err(|e| AsmError::grammar(e, sl))?;
                    if let Some(l) = found.loading {
                        debug!(line = sl, loading = %l, "loading register ignored on MOV");
                    }
                    (rd, None)
                }
                Some(Role::Transfer(desc)) => {
                    let rl = found.loading.ok_or_else(|| {
                        AsmError::reference(
                            format!(
                                "A label reference for a J[condition] or CALL instruction must contain a loading \
                                 register (the intermediary register used to load a label address in the event \
                                 that the equivalent displacement immediate instruction cannot be used due to the \
                                 label address offset being greater than the range of the immediate). e.g. {name}{}r1",
                                self.cfg.loading_register_separator
                            ),
                            sl,
                        )
                    })?;
                    (rl, Some(desc))
                }
                None => {
                    return Err(AsmError::reference(
                        format!(
                            "Label not allowed with instruction: {line}. Labels are only allowed for MOV, \
                             J[condition], and CALL instructions. Note that J[condition] and CALL instructions \
                             will become a B[condition] or CALLD instruction respectively if their label address \
                             is within the range of the displacement immediate."
                        ),
                        sl,
                    ));
                }
            };

            // The referencing line keeps its id and becomes MOVIL, so labels that
            // pointed at it now point at the first word of the expansion.
            self.program.line_mut(id).tokens = vec![MOVIL.into(), dest.name().into(), name.clone()];
            let high = self.program.insert(pos + 1, Line::new([MOVIU, dest.name(), name.as_str()], sl));
            let transfer = transfer.map(|desc| Transfer {
                line: self.program.insert(pos + 2, Line::new([desc.mnemonic, dest.name()], sl)),
                // `role` only admits jumps/calls that have a short form.
                short: desc.short_form().unwrap_or(desc),
            });
            pos += if transfer.is_some() { 3 } else { 2 };

            self.labels[found.label].uses += 1;
            self.refs.push(Reference {
                label: found.label,
                low: id,
                high,
                transfer,
                state: RefState::Expanded,
            });
        }
        debug!(references = self.refs.len(), "expanded label references");
        Ok(())
    }

    fn address(&self, label: usize) -> Result<usize> {
        let l = &self.labels[label];
        self.program.position(l.target).ok_or_else(|| {
            AsmError::layout(
                format!(
                    "Cannot get address for label: {}. An instruction or number must come after a label.",
                    l.name
                ),
                self.program.line(l.target).source_line,
            )
        })
    }

    fn displacement(&self, label: usize, from: LineId) -> Result<i64> {
        let target = self.address(label)? as i64;
        let at = self.program.position(from).ok_or_else(|| {
            AsmError::layout(
                format!("Line referencing {} was removed.", self.labels[label].name),
                self.program.line(from).source_line,
            )
        })? as i64;
        // Displacement forms jump to `pc + 1 + disp`.
        Ok(target - at - 1)
    }

    // TODO: repeat the sweep until nothing changes; collapsing one reference can
    // bring another, already rejected, reference into range.
    fn relax(&mut self) -> Result<()> {
        let mut relaxed = Vec::new();
        for i in 0..self.refs.len() {
            let r = self.refs[i];
            let Some(t) = r.transfer else { continue };
            let Some((min, max)) = t.short.format.displacement_range() else { continue };

            let disp = self.displacement(r.label, t.line)?;
            let fits = disp >= min as i64 && disp <= max as i64;
            trace!(
                label = %self.labels[r.label].name,
                disp,
                min,
                max,
                fits,
                "relaxation candidate"
            );
            if !fits {
                continue;
            }

            self.program.remove_id(t.line);
            self.program.remove_id(r.high);
            let name = self.labels[r.label].name.clone();
            self.program.line_mut(r.low).tokens = vec![t.short.mnemonic.into(), name];
            self.refs[i].state = RefState::Relaxed;
            relaxed.push(i);
        }

        // Addresses settle only after every collapse.
        for &i in &relaxed {
            let r = self.refs[i];
            let disp = self.displacement(r.label, r.low)?;
            self.program.line_mut(r.low).tokens[1] = disp.to_string();
        }
        debug!(relaxed = relaxed.len(), "relaxed jumps and calls");
        Ok(())
    }

    fn materialize(&mut self) -> Result<()> {
        for i in 0..self.refs.len() {
            let r = self.refs[i];
            if r.state != RefState::Expanded {
                continue;
            }
            let address = self.address(r.label)?;
            self.program.line_mut(r.low).tokens[2] = format!("{:#x}", address & 0xFF);
            self.program.line_mut(r.high).tokens[2] = format!("{:#x}", (address >> 8) & 0xFF);
            self.refs[i].state = RefState::Materialized;
        }
        Ok(())
    }

    fn finish(self) -> Result<Resolution> {
        let mut res = Resolution {
            expanded: self.refs.len(),
            relaxed: self.refs.iter().filter(|r| r.state == RefState::Relaxed).count(),
            ..Resolution::default()
        };
        for (i, label) in self.labels.iter().enumerate() {
            if label.uses == 0 {
                debug!(label = %label.name, line = label.source_line, "unused label");
                res.diagnostics.push(Diagnostic::warning(
                    format!("Unused label: {}", label.name),
                    Some(label.source_line),
                ));
            }
            res.symbols.push(Symbol {
                name: label.name.clone(),
                address: self.address(i)?,
            });
        }
        Ok(res)
    }
}
