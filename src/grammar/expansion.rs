//! Expansion engine
//!
//! Active expansions form a stack of frames read depth-first ahead of the
//! decoder. Each entity frame is a ticket: every codepoint read from any
//! frame is charged to every ticket on the stack, so an expansion's size
//! includes everything nested inside it. Exhausted frames are popped lazily,
//! right before the next read, so the last character of an entity is still
//! attributed to it.

use std::cell::{Cell, RefCell};
use std::num::NonZeroUsize;
use std::rc::Rc;
use std::sync::Arc;

use log::trace;
use lru::LruCache;

use super::control::EntityKind;
use crate::core::chars::{Codepoint, SPACE};
use crate::error::{Error, Result};

pub type TicketId = u64;

const CACHE_CAPACITY: NonZeroUsize = NonZeroUsize::MIN.saturating_add(31);

/// State shared by a pipeline and every nested pipeline it spawns
pub struct Shared {
    /// Expansions started anywhere in the parse
    count: Cell<usize>,
    /// Replacement text of external entities by resolved path
    cache: RefCell<LruCache<String, Arc<[Codepoint]>>>,
}

impl Shared {
    pub fn new() -> Rc<Self> {
        Rc::new(Shared {
            count: Cell::new(0),
            cache: RefCell::new(LruCache::new(CACHE_CAPACITY)),
        })
    }

    pub fn expansion_count(&self) -> usize {
        self.count.get()
    }

    pub fn cached(&self, path: &str) -> Option<Arc<[Codepoint]>> {
        self.cache.borrow_mut().get(path).cloned()
    }

    pub fn cache(&self, path: String, text: Arc<[Codepoint]>) {
        self.cache.borrow_mut().put(path, text);
    }
}

/// Identity of the innermost active entity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Head {
    id: TicketId,
    label: Arc<str>,
}

fn describe_head(head: &Option<Head>) -> String {
    match head {
        Some(head) => head.label.to_string(),
        None => "the document entity".to_string(),
    }
}

/// Verifies that a markup structure starts and ends in the same entity
///
/// Snapshots the head at creation; `lock_in` snapshots it again and `check`
/// compares the two.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundaryToken {
    opened: Option<Head>,
    closed: Option<Option<Head>>,
}

impl BoundaryToken {
    pub fn new(head: Option<Head>) -> Self {
        BoundaryToken { opened: head, closed: None }
    }

    pub fn lock_in(&mut self, head: Option<Head>) {
        self.closed = Some(head);
    }

    /// Whether `head` is the head captured at creation
    pub fn is_same(&self, head: &Option<Head>) -> bool {
        self.opened.as_ref().map(|h| h.id) == head.as_ref().map(|h| h.id)
    }

    pub fn check(&self, what: &str) -> Result<()> {
        match &self.closed {
            Some(closed) if !self.is_same(closed) => Err(Error::Boundary(format!(
                "{} started in {} but ended in {}",
                what,
                describe_head(&self.opened),
                describe_head(closed)
            ))),
            _ => Ok(()),
        }
    }
}

/// Chaos mode bookkeeping
#[derive(Debug, Default)]
pub struct Chaos {
    level: u32,
    suppressed: u32,
    /// Tokens for parentheses opened while chaos was active
    parens: Vec<BoundaryToken>,
}

impl Chaos {
    pub fn active(&self) -> bool {
        self.level > 0
    }

    /// Active and not suppressed: the pre-pass applies
    pub fn watching(&self) -> bool {
        self.level > 0 && self.suppressed == 0
    }

    pub fn enter(&mut self) {
        self.level += 1;
    }

    pub fn leave(&mut self) {
        self.level = self.level.saturating_sub(1);
    }

    pub fn suppress(&mut self) {
        self.suppressed += 1;
    }

    pub fn unsuppress(&mut self) {
        self.suppressed = self.suppressed.saturating_sub(1);
    }

    pub fn open_paren(&mut self, token: BoundaryToken) {
        self.parens.push(token);
    }

    pub fn close_paren(&mut self, head: Option<Head>) -> Result<()> {
        match self.parens.pop() {
            Some(mut token) => {
                token.lock_in(head);
                token.check("parenthesized group")
            }
            None => Ok(()),
        }
    }
}

/// Live record of one entity expansion
#[derive(Debug)]
pub struct Ticket {
    id: TicketId,
    name: String,
    kind: EntityKind,
    label: Arc<str>,
    /// Consumed codepoints; starts below zero to exclude padding
    counter: i64,
    /// Resolved path of an externally sourced entity
    origin: Option<String>,
    text: Arc<[Codepoint]>,
    pad: bool,
    pos: usize,
    /// Whether this expansion holds a chaos level
    chaos: bool,
}

impl Ticket {
    fn len(&self) -> usize {
        self.text.len() + if self.pad { 2 } else { 0 }
    }

    fn next(&mut self) -> Option<Codepoint> {
        if self.pos >= self.len() {
            return None;
        }
        let i = self.pos;
        self.pos += 1;
        if !self.pad {
            return Some(self.text[i]);
        }
        if i == 0 || i == self.text.len() + 1 {
            Some(SPACE)
        } else {
            Some(self.text[i - 1])
        }
    }
}

#[derive(Debug)]
enum Frame {
    Ticket(Ticket),
    /// Synthetic input; charged to no ticket and transparent to heads
    Injected { text: Vec<Codepoint>, pos: usize },
}

/// What to push for an expansion
pub struct ExpansionRequest {
    pub name: String,
    pub kind: EntityKind,
    pub text: Arc<[Codepoint]>,
    pub pad: bool,
    pub origin: Option<String>,
}

pub struct Expansion {
    frames: Vec<Frame>,
    next_id: TicketId,
    shared: Rc<Shared>,
    max_count: usize,
    max_size: usize,
}

fn display_name(name: &str, kind: EntityKind) -> String {
    match kind {
        EntityKind::General => name.to_string(),
        EntityKind::Parameter => format!("%{}", name),
    }
}

impl Expansion {
    pub fn new(shared: Rc<Shared>, max_count: usize, max_size: usize) -> Self {
        Expansion {
            frames: Vec::new(),
            next_id: 1,
            shared,
            max_count,
            max_size,
        }
    }

    pub fn shared(&self) -> &Rc<Shared> {
        &self.shared
    }

    fn tickets(&self) -> impl DoubleEndedIterator<Item = &Ticket> {
        self.frames.iter().filter_map(|frame| match frame {
            Frame::Ticket(ticket) => Some(ticket),
            Frame::Injected { .. } => None,
        })
    }

    /// Innermost active entity
    pub fn head(&self) -> Option<Head> {
        self.tickets().next_back().map(|t| Head { id: t.id, label: t.label.clone() })
    }

    pub fn depth(&self) -> usize {
        self.tickets().count()
    }

    /// Nearest origin path, walking outward
    pub fn origin(&self) -> Option<&str> {
        self.tickets().rev().find_map(|t| t.origin.as_deref())
    }

    /// Reject recursion and enforce the global count, then count this expansion
    pub fn admit(&self, name: &str, kind: EntityKind) -> Result<()> {
        if self.tickets().any(|t| t.name == name && t.kind == kind) {
            let mut chain: Vec<String> = self.tickets().map(|t| display_name(&t.name, t.kind)).collect();
            chain.push(display_name(name, kind));
            return Err(Error::Recursion {
                entity: display_name(name, kind),
                chain: chain.join(" => "),
            });
        }
        let count = self.shared.count.get();
        if count >= self.max_count {
            return Err(Error::ExpansionCount {
                entity: display_name(name, kind),
                limit: self.max_count,
            });
        }
        self.shared.count.set(count + 1);
        Ok(())
    }

    /// Push a ticket whose text is read ahead of everything below it
    pub fn push(&mut self, request: ExpansionRequest, chaos: &mut Chaos) -> TicketId {
        let id = self.next_id;
        self.next_id += 1;
        let holds_chaos = request.kind == EntityKind::Parameter && request.origin.is_some();
        if holds_chaos {
            chaos.enter();
        }
        let label: Arc<str> = match request.kind {
            EntityKind::General => format!("entity \"{}\"", request.name).into(),
            EntityKind::Parameter => format!("parameter entity \"%{};\"", request.name).into(),
        };
        trace!("expanding {} ({} codepoints)", label, request.text.len());
        self.frames.push(Frame::Ticket(Ticket {
            id,
            name: request.name,
            kind: request.kind,
            label,
            counter: if request.pad { -2 } else { 0 },
            origin: request.origin,
            text: request.text,
            pad: request.pad,
            pos: 0,
            chaos: holds_chaos,
        }));
        id
    }

    pub fn inject(&mut self, text: Vec<Codepoint>) {
        self.frames.push(Frame::Injected { text, pos: 0 });
    }

    /// Next codepoint from the innermost non-exhausted frame
    ///
    /// The flag is true when the codepoint came from an entity rather than
    /// injected text.
    pub fn next(&mut self, chaos: &mut Chaos) -> Result<Option<(Codepoint, bool)>> {
        loop {
            let Some(frame) = self.frames.last_mut() else {
                return Ok(None);
            };
            let next = match frame {
                Frame::Ticket(ticket) => ticket.next().map(|cp| (cp, true)),
                Frame::Injected { text, pos } => {
                    let cp = text.get(*pos).copied();
                    *pos += 1;
                    cp.map(|cp| (cp, false))
                }
            };
            match next {
                Some((cp, true)) => {
                    self.charge()?;
                    return Ok(Some((cp, true)));
                }
                Some(injected) => return Ok(Some(injected)),
                None => {
                    if let Some(Frame::Ticket(ticket)) = self.frames.pop() {
                        trace!("finished {} after {} codepoints", ticket.label, ticket.counter);
                        if ticket.chaos {
                            chaos.leave();
                        }
                    }
                }
            }
        }
    }

    /// Charge one codepoint to every active ticket
    fn charge(&mut self) -> Result<()> {
        let limit = self.max_size as i64;
        let mut exceeded = None;
        for frame in self.frames.iter_mut() {
            if let Frame::Ticket(ticket) = frame {
                ticket.counter += 1;
                if ticket.counter > limit && exceeded.is_none() {
                    exceeded = Some(display_name(&ticket.name, ticket.kind));
                }
            }
        }
        match exceeded {
            Some(entity) => Err(Error::ExpansionSize { entity, limit: self.max_size }),
            None => Ok(()),
        }
    }
}
