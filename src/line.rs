//! The program under assembly: an ordered sequence of token lines.
//!
//! Lines live in an arena and are addressed by a stable [`LineId`]. The
//! sequence order is kept separately together with an id → position index, so
//! a label can keep pointing at "its" line while lines are inserted and
//! removed around it. A line's address is its current position.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LineId(usize);

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub tokens: Vec<String>,
    /// 1-based line in the input text.
    pub source_line: usize,
}

impl Line {
    pub fn new<S: Into<String>>(tokens: impl IntoIterator<Item = S>, source_line: usize) -> Self {
        Self {
            tokens: tokens.into_iter().map(Into::into).collect(),
            source_line,
        }
    }

    pub fn first(&self) -> &str {
        self.tokens.first().map(String::as_str).unwrap_or("")
    }
}

impl fmt::Display for Line {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.tokens.join(" "))
    }
}

#[derive(Debug, Clone, Default)]
pub struct Program {
    arena: Vec<Line>,
    order: Vec<LineId>,
    /// Indexed by `LineId`; `None` once the line has been removed.
    positions: Vec<Option<usize>>,
}

impl Program {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_lines(lines: impl IntoIterator<Item = Line>) -> Self {
        let mut p = Self::new();
        for line in lines {
            p.push(line);
        }
        p
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    fn alloc(&mut self, line: Line) -> LineId {
        let id = LineId(self.arena.len());
        self.arena.push(line);
        self.positions.push(None);
        id
    }

    pub fn push(&mut self, line: Line) -> LineId {
        let id = self.alloc(line);
        self.positions[id.0] = Some(self.order.len());
        self.order.push(id);
        id
    }

    /// Inserts before the line currently at `pos` (or appends when `pos == len`).
    pub fn insert(&mut self, pos: usize, line: Line) -> LineId {
        let id = self.alloc(line);
        self.order.insert(pos, id);
        self.reindex_from(pos);
        id
    }

    pub fn remove(&mut self, pos: usize) -> LineId {
        let id = self.order.remove(pos);
        self.positions[id.0] = None;
        self.reindex_from(pos);
        id
    }

    /// Removes `id` if it is still part of the sequence; returns its old position.
    pub fn remove_id(&mut self, id: LineId) -> Option<usize> {
        let pos = self.position(id)?;
        self.remove(pos);
        Some(pos)
    }

    /// Removes every line for which `keep` is false.
    pub fn retain(&mut self, mut keep: impl FnMut(&Line) -> bool) {
        let arena = &self.arena;
        let positions = &mut self.positions;
        self.order.retain(|id| {
            let k = keep(&arena[id.0]);
            if !k {
                positions[id.0] = None;
            }
            k
        });
        self.reindex_from(0);
    }

    fn reindex_from(&mut self, start: usize) {
        for (pos, id) in self.order.iter().enumerate().skip(start) {
            self.positions[id.0] = Some(pos);
        }
    }

    /// Current address of `id`, or `None` if it was removed.
    pub fn position(&self, id: LineId) -> Option<usize> {
        self.positions.get(id.0).copied().flatten()
    }

    pub fn id_at(&self, pos: usize) -> Option<LineId> {
        self.order.get(pos).copied()
    }

    pub fn line(&self, id: LineId) -> &Line {
        &self.arena[id.0]
    }

    pub fn line_mut(&mut self, id: LineId) -> &mut Line {
        &mut self.arena[id.0]
    }

    pub fn ids(&self) -> impl Iterator<Item = LineId> + '_ {
        self.order.iter().copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> + '_ {
        self.order.iter().map(move |id| &self.arena[id.0])
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Line> + '_ {
        // Arena order, not sequence order.
        let positions = &self.positions;
        self.arena
            .iter_mut()
            .enumerate()
            .filter(move |(i, _)| positions[*i].is_some())
            .map(|(_, l)| l)
    }
}
