//! Grammar driver
//!
//! Push-down dispatch over a stack of production frames. Codepoints are
//! taken, in priority order, from the holdover replay queue, the active
//! expansion frames and finally the decoder. The driver is grammar-agnostic:
//! it interprets [`Control`] values and services [`Signal`]s, and only knows
//! two characters itself, the `%` and parentheses watched by the chaos
//! pre-pass.

use std::collections::VecDeque;
use std::rc::Rc;
use std::sync::Arc;

use log::debug;

use super::context::Context;
use super::control::{Control, EntityKind, Input, Product, Production, Reply, Signal};
use super::expansion::{BoundaryToken, Chaos, Expansion, ExpansionRequest, Shared};
use super::position::Position;
use super::productions::{Document, ExternalRoot, PeReference};
use crate::core::chars::{describe, is_char, Codepoint, EOF};
use crate::core::decoder::{Decoder, Pull};
use crate::core::dtd::DtdDeclarations;
use crate::dom::TreeBuilder;
use crate::error::{Error, Result};
use crate::options::{ParseOptions, Target};

const PERCENT: Codepoint = '%' as Codepoint;
const LPAREN: Codepoint = '(' as Codepoint;
const RPAREN: Codepoint = ')' as Codepoint;

/// Root production of a pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Root {
    Document,
    ExtSubset,
    ExtEntity,
    /// Replacement text of an external parsed entity
    Replacement,
}

impl Root {
    fn stage(self) -> &'static str {
        match self {
            Root::Document => "Document parse",
            Root::ExtSubset => "External subset parse",
            Root::ExtEntity | Root::Replacement => "External entity parse",
        }
    }
}

impl From<Target> for Root {
    fn from(target: Target) -> Self {
        match target {
            Target::Document => Root::Document,
            Target::ExtSubset => Root::ExtSubset,
            Target::ExtEntity => Root::ExtEntity,
        }
    }
}

/// External content the driver is waiting for
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetch {
    pub kind: FetchKind,
    pub name: String,
    pub public_id: Option<String>,
    pub system_id: String,
    /// System identifier resolved against the nearest origin
    pub path: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchKind {
    Entity { kind: EntityKind, pad: bool },
    Subset,
}

/// Why the driver stopped
#[derive(Debug)]
pub enum Event {
    NeedInput,
    Fetch(Fetch),
    Finished(Product),
}

struct Frame {
    production: Box<dyn Production>,
    /// Parameter reference opened by the chaos pre-pass
    detour: bool,
}

pub struct Driver {
    root: Root,
    stack: Vec<Frame>,
    builder: TreeBuilder,
    expansion: Expansion,
    chaos: Chaos,
    position: Position,
    options: ParseOptions,
    /// Held-over codepoints; the flag says whether the pre-pass still applies
    replay: VecDeque<(Codepoint, bool)>,
    pending: Option<Input>,
    awaiting: Option<Fetch>,
    /// Codepoint being fed, for messages about non-character inputs
    current: Codepoint,
    eof_delivered: bool,
}

impl Driver {
    pub fn new(root: Root, options: ParseOptions, shared: Rc<Shared>, dtd: DtdDeclarations) -> Self {
        let production: Box<dyn Production> = match root {
            Root::Document => Box::new(Document::new()),
            Root::ExtSubset => Box::new(ExternalRoot::subset()),
            Root::ExtEntity => Box::new(ExternalRoot::entity()),
            Root::Replacement => Box::new(ExternalRoot::replacement()),
        };
        let mut chaos = Chaos::default();
        if root == Root::ExtSubset {
            chaos.enter();
        }
        let mut builder = TreeBuilder::new();
        builder.restore_dtd(dtd);
        let expansion = Expansion::new(shared, options.max_expansion_count, options.max_expansion_size);
        Driver {
            root,
            stack: vec![Frame { production, detour: false }],
            builder,
            expansion,
            chaos,
            position: Position::default(),
            options,
            replay: VecDeque::new(),
            pending: None,
            awaiting: None,
            current: EOF,
            eof_delivered: false,
        }
    }

    pub fn shared(&self) -> &Rc<Shared> {
        self.expansion.shared()
    }

    pub fn builder_mut(&mut self) -> &mut TreeBuilder {
        &mut self.builder
    }

    pub fn take_builder(&mut self) -> TreeBuilder {
        std::mem::take(&mut self.builder)
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    /// Splice fetched replacement text in and answer the waiting reference
    pub fn complete_entity(&mut self, text: Arc<[Codepoint]>) -> Result<()> {
        match self.awaiting.take() {
            Some(Fetch { kind: FetchKind::Entity { kind, pad }, name, path, .. }) => {
                let request = ExpansionRequest { name, kind, text, pad, origin: Some(path) };
                self.expansion.push(request, &mut self.chaos);
                self.pending = Some(Input::Reply(Reply::Expanded));
                Ok(())
            }
            _ => Err(Error::InvalidResource("no entity dereference is outstanding".into())),
        }
    }

    /// Answer the waiting DOCTYPE after its external subset was parsed
    pub fn complete_subset(&mut self) -> Result<()> {
        match self.awaiting.take() {
            Some(Fetch { kind: FetchKind::Subset, .. }) => {
                self.pending = Some(Input::Reply(Reply::SubsetLoaded));
                Ok(())
            }
            _ => Err(Error::InvalidResource("no DTD dereference is outstanding".into())),
        }
    }

    /// Drive productions until input runs dry, a fetch is needed or the
    /// root production finishes
    pub fn run(&mut self, decoder: &mut Decoder) -> Result<Event> {
        loop {
            if let Some(input) = self.pending.take() {
                if let Some(event) = self.feed(input, decoder)? {
                    return Ok(event);
                }
                continue;
            }

            let (cp, prepass) = match self.replay.pop_front() {
                Some(item) => item,
                None => match self.expansion.next(&mut self.chaos)? {
                    Some((cp, _)) => {
                        self.position.record(cp, false);
                        (cp, true)
                    }
                    None => match decoder.next()? {
                        Pull::Char(cp) => {
                            self.position.record(cp, true);
                            if !is_char(cp) {
                                return Err(self.failure(cp, &format!(
                                    "a legal document character (found {})",
                                    describe(cp)
                                )));
                            }
                            (cp, true)
                        }
                        Pull::Wait => return Ok(Event::NeedInput),
                        Pull::End if self.eof_delivered => {
                            return Err(self.failure(EOF, "more input"));
                        }
                        Pull::End => {
                            self.eof_delivered = true;
                            (EOF, false)
                        }
                    },
                },
            };

            if prepass && self.chaos.watching() && !self.top_is_detour() {
                match cp {
                    PERCENT => {
                        self.current = cp;
                        self.stack.push(Frame {
                            production: Box::new(PeReference::detour(BoundaryToken::new(self.expansion.head()))),
                            detour: true,
                        });
                        continue;
                    }
                    LPAREN => self.chaos.open_paren(BoundaryToken::new(self.expansion.head())),
                    RPAREN => self.chaos.close_paren(self.expansion.head())?,
                    _ => {}
                }
            }

            if let Some(event) = self.feed(Input::Char(cp), decoder)? {
                return Ok(event);
            }
        }
    }

    fn top_is_detour(&self) -> bool {
        self.stack.last().is_some_and(|frame| frame.detour)
    }

    fn failure(&self, cp: Codepoint, expectation: &str) -> Error {
        Error::Syntax(self.position.describe_failure(self.root.stage(), cp, expectation))
    }

    /// Resume the top production and act on its answer
    fn feed(&mut self, input: Input, decoder: &mut Decoder) -> Result<Option<Event>> {
        if let Input::Char(cp) = input {
            self.current = cp;
        }
        let Some(frame) = self.stack.last_mut() else {
            return Err(Error::Finished);
        };
        let detour = frame.detour;
        let mut cx = Context {
            builder: &mut self.builder,
            chaos: &mut self.chaos,
            expansion: &self.expansion,
            options: &self.options,
        };
        let control = frame.production.resume(input, &mut cx);

        match control {
            Control::Continue => {}
            Control::Holdover(cp) => self.replay.push_front((cp, detour)),
            Control::Inject(text) => self.expansion.inject(text),
            Control::Fail(expectation) => return Err(self.failure(self.current, &expectation)),
            Control::Abort(err) => return Err(err),
            Control::Call(production, holdover) => {
                if let Some(cp) = holdover {
                    self.replay.push_front((cp, detour));
                }
                self.stack.push(Frame { production, detour: false });
            }
            Control::Done(product, holdover) => {
                self.stack.pop();
                if let Some(cp) = holdover {
                    self.replay.push_front((cp, detour));
                }
                if detour {
                    if product == Product::Passthrough {
                        self.replay.push_front((PERCENT, false));
                    }
                } else if self.stack.is_empty() {
                    return Ok(Some(Event::Finished(product)));
                } else {
                    self.pending = Some(Input::Returned(product));
                }
            }
            Control::Signal(signal) => return self.signal(signal, decoder),
        }
        Ok(None)
    }

    fn signal(&mut self, signal: Signal, decoder: &mut Decoder) -> Result<Option<Event>> {
        match signal {
            Signal::Expand { name, kind, pad } => self.expand(name, kind, pad),
            Signal::DereferenceSubset { name, public_id, system_id } => {
                let path = self.context_path(&system_id);
                let fetch = Fetch { kind: FetchKind::Subset, name, public_id, system_id, path };
                debug!("dereferencing external subset {}", fetch.path);
                self.awaiting = Some(fetch.clone());
                Ok(Some(Event::Fetch(fetch)))
            }
            Signal::DeclareEncoding(label) => {
                decoder.set_encoding(&label)?;
                self.pending = Some(Input::Reply(Reply::Acknowledged));
                Ok(None)
            }
        }
    }

    fn context_path(&self, system_id: &str) -> String {
        let base = self.expansion.origin().or(self.options.path.as_deref());
        super::context::resolve_path(base, system_id)
    }

    fn expand(&mut self, name: String, kind: EntityKind, pad: bool) -> Result<Option<Event>> {
        let dtd = self.builder.dtd();
        let decl = match kind {
            EntityKind::General => dtd.entity(&name),
            EntityKind::Parameter => dtd.parameter_entity(&name),
        };
        let Some(decl) = decl.cloned() else {
            return Err(self.failure(self.current, &format!("entity \"{}\" to have been declared", name)));
        };
        self.expansion.admit(&name, kind)?;

        if let Some(text) = decl.value {
            let request = ExpansionRequest { name, kind, text, pad, origin: None };
            self.expansion.push(request, &mut self.chaos);
            self.pending = Some(Input::Reply(Reply::Expanded));
            return Ok(None);
        }

        let external = decl.external.unwrap_or_default();
        let system_id = external.system_id.unwrap_or_default();
        let path = decl.path.unwrap_or_else(|| self.context_path(&system_id));
        let fetch = Fetch {
            kind: FetchKind::Entity { kind, pad },
            name,
            public_id: external.public_id,
            system_id,
            path,
        };
        if let Some(text) = self.shared().cached(&cache_key(&fetch.path)) {
            debug!("reusing cached replacement text of {}", fetch.path);
            self.awaiting = Some(fetch);
            self.complete_entity(text)?;
            return Ok(None);
        }
        debug!("dereferencing external entity {} ({})", fetch.name, fetch.path);
        self.awaiting = Some(fetch.clone());
        Ok(Some(Event::Fetch(fetch)))
    }
}

/// Cache key for the replacement text of an external entity
pub fn cache_key(path: &str) -> String {
    format!("ENTITY {}", path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::chars::to_string;
    use pretty_assertions::assert_eq;

    fn drive(root: Root, input: &str) -> Result<(Event, Driver)> {
        let mut decoder = Decoder::new(None)?;
        decoder.write(input.as_bytes())?;
        decoder.end();
        let mut driver = Driver::new(root, ParseOptions::default(), Shared::new(), DtdDeclarations::new());
        let event = driver.run(&mut decoder)?;
        Ok((event, driver))
    }

    #[test]
    fn test_waits_for_more_input() {
        let mut decoder = Decoder::new(None).unwrap();
        decoder.write(b"<a>te").unwrap();
        let mut driver = Driver::new(Root::Document, ParseOptions::default(), Shared::new(), DtdDeclarations::new());
        assert!(matches!(driver.run(&mut decoder).unwrap(), Event::NeedInput));
    }

    #[test]
    fn test_replacement_root_collects_text() {
        let (event, _) = drive(Root::Replacement, "<?xml encoding='UTF-8'?>a<b/>c").unwrap();
        match event {
            Event::Finished(Product::Text(text)) => assert_eq!(to_string(&text), "a<b/>c"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_replacement_root_without_text_declaration() {
        let (event, _) = drive(Root::Replacement, "<?xmlfoo?>").unwrap();
        match event {
            Event::Finished(Product::Text(text)) => assert_eq!(to_string(&text), "<?xmlfoo?>"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_illegal_character() {
        let err = drive(Root::Document, "<a>\u{1}</a>").err().unwrap();
        assert!(err.to_string().contains("a legal document character"), "{}", err);
    }

    #[test]
    fn test_external_subset_requests_fetch() {
        let (event, _) = drive(Root::Document, "<!DOCTYPE a SYSTEM \"a.dtd\"><a/>").unwrap();
        match event {
            Event::Fetch(fetch) => {
                assert_eq!(fetch.kind, FetchKind::Subset);
                assert_eq!(fetch.path, "a.dtd");
            }
            other => panic!("unexpected {:?}", other),
        }
    }
}
