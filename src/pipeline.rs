//! Push-style parse pipeline
//!
//! A pipeline owns one decoder and one grammar driver. When the driver needs
//! external content the pipeline halts and reports a [`DerefRequest`]; the
//! caller answers with [`Pipeline::supply`], which parses the resource in a
//! nested pipeline sharing the expansion counter and resource cache, then
//! resumes. Nested pipelines may themselves halt; their requests surface
//! from the outermost pipeline unchanged.
//!
//! A resource answered with [`EntityBody::Stream`] is read to its end before
//! any of it is parsed, in `parse_async` as well.

use std::io::Read;
use std::rc::Rc;
use std::sync::Arc;

use log::debug;

use crate::core::chars::Codepoint;
use crate::core::decoder::Decoder;
use crate::core::dtd::DtdDeclarations;
use crate::dom::Document;
use crate::error::{Error, Result};
use crate::gateway::{DerefRequest, EntityBody, Resource};
use crate::grammar::control::Product;
use crate::grammar::driver::cache_key;
use crate::grammar::expansion::Shared;
use crate::grammar::{Driver, Event, Fetch, FetchKind, Root};
use crate::options::ParseOptions;

pub(crate) const READ_CHUNK: usize = 8 * 1024;

/// Where a pipeline stands after a call
#[derive(Debug)]
pub enum Status {
    /// Write more input, or end it
    NeedInput,
    /// Halted until the request is answered with [`Pipeline::supply`]
    Pending(DerefRequest),
    Done(Document),
}

/// Internal progress; nested pipelines finish with a product, not a tree
enum Progress {
    NeedInput,
    Pending(DerefRequest),
    Finished(Product),
}

struct Nested {
    pipeline: Pipeline,
    fetch: Fetch,
}

pub struct Pipeline {
    decoder: Decoder,
    driver: Driver,
    nested: Option<Box<Nested>>,
    /// Fetch the driver is halted on
    awaiting: Option<Fetch>,
    failed: Option<Error>,
    done: bool,
}

impl Pipeline {
    /// Create a top-level pipeline; an unknown explicit encoding fails here
    pub fn new(options: ParseOptions) -> Result<Self> {
        let root = Root::from(options.target);
        Self::with_root(root, options, Shared::new(), DtdDeclarations::new())
    }

    fn with_root(root: Root, options: ParseOptions, shared: Rc<Shared>, dtd: DtdDeclarations) -> Result<Self> {
        let decoder = Decoder::new(options.encoding.as_deref())?;
        Ok(Pipeline {
            decoder,
            driver: Driver::new(root, options, shared, dtd),
            nested: None,
            awaiting: None,
            failed: None,
            done: false,
        })
    }

    pub fn is_halted(&self) -> bool {
        self.awaiting.is_some()
    }

    /// Feed a chunk of bytes
    pub fn write(&mut self, chunk: &[u8]) -> Result<Status> {
        self.accepting()?;
        let written = self.decoder.write(chunk);
        self.latch(written)?;
        self.pump()
    }

    /// Feed already-decoded text
    pub fn write_text(&mut self, text: &str) -> Result<Status> {
        self.accepting()?;
        let written = self.decoder.write_text(text);
        self.latch(written)?;
        self.pump()
    }

    /// Mark the end of input
    pub fn end(&mut self) -> Result<Status> {
        self.accepting()?;
        self.decoder.end();
        self.pump()
    }

    /// Answer the outstanding request
    pub fn supply(&mut self, resource: Resource) -> Result<Status> {
        self.check()?;
        let progress = self.answer(resource);
        let progress = self.latch(progress)?;
        self.status(progress)
    }

    fn check(&self) -> Result<()> {
        if let Some(err) = &self.failed {
            return Err(err.clone());
        }
        if self.done {
            return Err(Error::Finished);
        }
        Ok(())
    }

    fn accepting(&self) -> Result<()> {
        self.check()?;
        if self.is_halted() {
            return Err(Error::Halted);
        }
        Ok(())
    }

    fn latch<T>(&mut self, result: Result<T>) -> Result<T> {
        if let Err(err) = &result {
            if err.is_fatal() && self.failed.is_none() {
                self.failed = Some(err.clone());
            }
        }
        result
    }

    fn pump(&mut self) -> Result<Status> {
        let progress = self.advance();
        let progress = self.latch(progress)?;
        self.status(progress)
    }

    fn status(&mut self, progress: Progress) -> Result<Status> {
        Ok(match progress {
            Progress::NeedInput => Status::NeedInput,
            Progress::Pending(request) => Status::Pending(request),
            Progress::Finished(_) => Status::Done(self.driver.take_builder().finish()),
        })
    }

    /// Run the driver until it needs input, halts or finishes
    fn advance(&mut self) -> Result<Progress> {
        match self.driver.run(&mut self.decoder)? {
            Event::NeedInput => Ok(Progress::NeedInput),
            Event::Fetch(fetch) => {
                self.decoder.halt();
                let request = DerefRequest::from_fetch(&fetch);
                self.awaiting = Some(fetch);
                Ok(Progress::Pending(request))
            }
            Event::Finished(product) => {
                self.done = true;
                Ok(Progress::Finished(product))
            }
        }
    }

    fn answer(&mut self, resource: Resource) -> Result<Progress> {
        if let Some(nested) = self.nested.as_mut() {
            let progress = nested.pipeline.answer(resource)?;
            return self.after_nested(progress);
        }
        let Some(fetch) = self.awaiting.clone() else {
            return Err(Error::InvalidResource("no dereference is outstanding".into()));
        };
        let progress = self.spawn(fetch, resource)?;
        self.after_nested(progress)
    }

    /// Parse a resource in a nested pipeline scoped to it
    fn spawn(&mut self, fetch: Fetch, resource: Resource) -> Result<Progress> {
        let (root, dtd) = match fetch.kind {
            FetchKind::Entity { .. } => (Root::Replacement, DtdDeclarations::new()),
            FetchKind::Subset => (Root::ExtSubset, self.driver.builder_mut().take_dtd()),
        };
        let mut options = self.driver.options().clone();
        options.path = Some(fetch.path.clone());
        options.encoding = resource.encoding;
        debug!("nested {:?} pipeline for {}", root, fetch.path);

        let shared = Rc::clone(self.driver.shared());
        let mut pipeline = Pipeline::with_root(root, options, shared, dtd)?;
        pipeline.load(resource.entity)?;
        pipeline.decoder.end();
        let progress = pipeline.advance()?;
        self.nested = Some(Box::new(Nested { pipeline, fetch }));
        Ok(progress)
    }

    /// Hand a whole resource to the decoder before any of it is parsed
    fn load(&mut self, entity: EntityBody) -> Result<()> {
        match entity {
            EntityBody::Text(text) => self.decoder.write_text(&text),
            EntityBody::Bytes(bytes) => self.decoder.write(&bytes),
            EntityBody::Stream(mut reader) => {
                let mut buf = vec![0u8; READ_CHUNK];
                loop {
                    let n = reader.read(&mut buf)?;
                    if n == 0 {
                        return Ok(());
                    }
                    self.decoder.write(&buf[..n])?;
                }
            }
        }
    }

    fn after_nested(&mut self, progress: Progress) -> Result<Progress> {
        match progress {
            Progress::Pending(request) => Ok(Progress::Pending(request)),
            Progress::NeedInput => Err(Error::InvalidResource("dereferenced resource ended early".into())),
            Progress::Finished(product) => {
                let Some(nested) = self.nested.take() else {
                    return Err(Error::InvalidResource("no nested parse is running".into()));
                };
                let Nested { mut pipeline, fetch } = *nested;
                match fetch.kind {
                    FetchKind::Entity { .. } => {
                        let text: Arc<[Codepoint]> = match product {
                            Product::Text(text) => text.into(),
                            _ => Arc::from(Vec::new()),
                        };
                        self.driver.shared().cache(cache_key(&fetch.path), text.clone());
                        self.driver.complete_entity(text)?;
                    }
                    FetchKind::Subset => {
                        let dtd = pipeline.driver.builder_mut().take_dtd();
                        self.driver.builder_mut().restore_dtd(dtd);
                        self.driver.complete_subset()?;
                    }
                }
                self.awaiting = None;
                self.decoder.resume();
                self.advance()
            }
        }
    }
}
