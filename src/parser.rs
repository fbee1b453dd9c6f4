//! Entry points
//!
//! Each entry point feeds a [`Source`] through a [`Pipeline`] and answers
//! every dereference request with a resolver until the document is done.

use std::borrow::Cow;
use std::io::Read;

use crate::dom::Document;
use crate::error::{Error, Result};
use crate::gateway::{AsyncResolver, NoResolver, Resolver};
use crate::options::ParseOptions;
use crate::pipeline::{Pipeline, Status, READ_CHUNK};

/// Input of a parse
pub enum Source<'a> {
    Text(Cow<'a, str>),
    Bytes(Cow<'a, [u8]>),
    /// Read in fixed-size chunks
    Stream(Box<dyn Read + 'a>),
}

impl<'a> From<&'a str> for Source<'a> {
    fn from(text: &'a str) -> Self {
        Source::Text(Cow::Borrowed(text))
    }
}

impl From<String> for Source<'_> {
    fn from(text: String) -> Self {
        Source::Text(Cow::Owned(text))
    }
}

impl<'a> From<&'a [u8]> for Source<'a> {
    fn from(bytes: &'a [u8]) -> Self {
        Source::Bytes(Cow::Borrowed(bytes))
    }
}

impl From<Vec<u8>> for Source<'_> {
    fn from(bytes: Vec<u8>) -> Self {
        Source::Bytes(Cow::Owned(bytes))
    }
}

impl<'a> From<Box<dyn Read + 'a>> for Source<'a> {
    fn from(reader: Box<dyn Read + 'a>) -> Self {
        Source::Stream(reader)
    }
}

/// Hands a source to a pipeline one piece at a time, then ends it
struct Feed<'a> {
    source: Option<Source<'a>>,
    buf: Vec<u8>,
    ended: bool,
}

impl<'a> Feed<'a> {
    fn new(source: Source<'a>) -> Self {
        Feed { source: Some(source), buf: Vec::new(), ended: false }
    }

    fn push(&mut self, pipeline: &mut Pipeline) -> Result<Status> {
        match self.source.take() {
            Some(Source::Text(text)) => pipeline.write_text(&text),
            Some(Source::Bytes(bytes)) => pipeline.write(&bytes),
            Some(Source::Stream(mut reader)) => {
                if self.buf.is_empty() {
                    self.buf.resize(READ_CHUNK, 0);
                }
                let n = reader.read(&mut self.buf)?;
                if n == 0 {
                    return self.end(pipeline);
                }
                self.source = Some(Source::Stream(reader));
                pipeline.write(&self.buf[..n])
            }
            None => self.end(pipeline),
        }
    }

    fn end(&mut self, pipeline: &mut Pipeline) -> Result<Status> {
        self.ended = true;
        pipeline.end()
    }
}

fn unfinished() -> Error {
    Error::InvalidResource("input ended without a complete result".into())
}

/// Synchronous parser with a resolver for external content
pub struct Parser<R = NoResolver> {
    options: ParseOptions,
    resolver: R,
}

impl Parser<NoResolver> {
    pub fn new(options: ParseOptions) -> Self {
        Parser { options, resolver: NoResolver }
    }
}

impl<R: Resolver> Parser<R> {
    /// Replace the resolver
    pub fn resolver<S: Resolver>(self, resolver: S) -> Parser<S> {
        Parser { options: self.options, resolver }
    }

    pub fn options(&self) -> &ParseOptions {
        &self.options
    }

    pub fn parse<'a>(&mut self, source: impl Into<Source<'a>>) -> Result<Document> {
        let mut pipeline = Pipeline::new(self.options.clone())?;
        let mut feed = Feed::new(source.into());
        loop {
            let mut status = feed.push(&mut pipeline)?;
            while let Status::Pending(request) = status {
                let resource = self.resolver.resolve(&request)?;
                status = pipeline.supply(resource)?;
            }
            match status {
                Status::Done(document) => return Ok(document),
                _ if feed.ended => return Err(unfinished()),
                _ => {}
            }
        }
    }
}

/// Parse without a resolver; external references fail with
/// [`Error::MissingResolver`]
pub fn parse<'a>(source: impl Into<Source<'a>>, options: &ParseOptions) -> Result<Document> {
    Parser::new(options.clone()).parse(source)
}

/// Parse, awaiting the resolver at every dereference
pub async fn parse_async<'a, R: AsyncResolver>(
    source: impl Into<Source<'a>>,
    options: &ParseOptions,
    resolver: &mut R,
) -> Result<Document> {
    let mut pipeline = Pipeline::new(options.clone())?;
    let mut feed = Feed::new(source.into());
    loop {
        let mut status = feed.push(&mut pipeline)?;
        while let Status::Pending(request) = status {
            let resource = resolver.resolve(&request).await?;
            status = pipeline.supply(resource)?;
        }
        match status {
            Status::Done(document) => return Ok(document),
            _ if feed.ended => return Err(unfinished()),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{DerefKind, DerefRequest, MapResolver, Resource};
    use crate::options::Target;
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::future::Future;
    use std::io::Cursor;
    use std::task::{Context, Poll, Waker};

    fn block_on<F: Future>(future: F) -> F::Output {
        let mut future = std::pin::pin!(future);
        let mut cx = Context::from_waker(Waker::noop());
        loop {
            if let Poll::Ready(output) = future.as_mut().poll(&mut cx) {
                return output;
            }
        }
    }

    fn resources(entries: &[(&str, &str)]) -> HashMap<String, Vec<u8>> {
        entries.iter().map(|(k, v)| (k.to_string(), v.as_bytes().to_vec())).collect()
    }

    /// Yields a few bytes per read
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
            let n = self.0.len().min(buf.len()).min(3);
            buf[..n].copy_from_slice(&self.0[..n]);
            self.0 = &self.0[n..];
            Ok(n)
        }
    }

    #[test]
    fn test_parse_text() {
        let doc = parse("<greeting>hello</greeting>", &ParseOptions::default()).unwrap();
        assert_eq!(doc.root_name(), Some("greeting"));
        assert_eq!(doc.text(doc.root_element_id().unwrap()), "hello");
    }

    #[test]
    fn test_parse_stream() {
        let bytes = "<a>héllo</a>".as_bytes();
        let source: Box<dyn Read> = Box::new(Trickle(bytes));
        let doc = parse(source, &ParseOptions::default()).unwrap();
        assert_eq!(doc.text(doc.root_element_id().unwrap()), "héllo");
    }

    #[test]
    fn test_parse_utf16_bytes() {
        let mut bytes = vec![0xFF, 0xFE];
        for unit in "<a>ok</a>".encode_utf16() {
            bytes.extend_from_slice(&unit.to_le_bytes());
        }
        let doc = parse(bytes, &ParseOptions::default()).unwrap();
        assert_eq!(doc.text(doc.root_element_id().unwrap()), "ok");
    }

    #[test]
    fn test_missing_resolver() {
        let err = parse("<!DOCTYPE a SYSTEM 'a.dtd'><a/>", &ParseOptions::default()).unwrap_err();
        assert_eq!(
            err,
            Error::MissingResolver { kind: "DTD", name: "a".into(), system_id: "a.dtd".into() }
        );
    }

    #[test]
    fn test_external_entity() {
        let map = resources(&[("chap.xml", "<?xml encoding='UTF-8'?><p>one &amp; two</p>")]);
        let doc = Parser::new(ParseOptions::default())
            .resolver(MapResolver::new(&map))
            .parse("<!DOCTYPE book [<!ENTITY chap SYSTEM 'chap.xml'>]><book>&chap;</book>")
            .unwrap();
        assert_eq!(doc.text(doc.root_element_id().unwrap()), "one & two");
    }

    #[test]
    fn test_external_entity_fetched_once() {
        let mut requests = Vec::new();
        let mut resolver = |request: &DerefRequest| -> Result<Resource> {
            requests.push(request.path.clone());
            Ok(Resource::text("x"))
        };
        let doc = Parser::new(ParseOptions::default().path("dir/doc.xml"))
            .resolver(&mut resolver)
            .parse("<!DOCTYPE a [<!ENTITY e SYSTEM 'e.txt'>]><a>&e;&e;&e;</a>")
            .unwrap();
        assert_eq!(doc.text(doc.root_element_id().unwrap()), "xxx");
        assert_eq!(requests, vec!["dir/e.txt".to_string()]);
    }

    #[test]
    fn test_conditional_sections() {
        let dtd = "<!ENTITY % draft 'IGNORE'>\n\
                   <![%draft;[<!ELEMENT x ANY>]]>\n\
                   <![ INCLUDE [<!ELEMENT a ANY>]]>";
        let map = resources(&[("a.dtd", dtd)]);
        let doc = Parser::new(ParseOptions::default())
            .resolver(MapResolver::new(&map))
            .parse("<!DOCTYPE a SYSTEM 'a.dtd'><a/>")
            .unwrap();
        assert!(doc.dtd.elements.contains_key("a"));
        assert!(!doc.dtd.elements.contains_key("x"));
        assert_eq!(doc.dtd.len(), 2);
    }

    #[test]
    fn test_nested_ignore_sections() {
        let dtd = "<![IGNORE[ <![INCLUDE[ <!ELEMENT x ANY> ]]> <!ELEMENT y ANY> ]]><!ELEMENT a EMPTY>";
        let map = resources(&[("a.dtd", dtd)]);
        let doc = Parser::new(ParseOptions::default())
            .resolver(MapResolver::new(&map))
            .parse("<!DOCTYPE a SYSTEM 'a.dtd'><a/>")
            .unwrap();
        assert_eq!(doc.dtd.elements.len(), 1);
    }

    #[test]
    fn test_expansion_size_limit() {
        let options = ParseOptions::default().max_expansion_size(25);
        let err = parse(
            "<!DOCTYPE a [<!ENTITY big '0123456789'><!ENTITY huge '&big;&big;&big;'>]><a>&huge;</a>",
            &options,
        )
        .unwrap_err();
        assert_eq!(err, Error::ExpansionSize { entity: "huge".into(), limit: 25 });
    }

    #[test]
    fn test_expansion_count_limit() {
        let options = ParseOptions::default().max_expansion_count(2);
        let err = parse("<!DOCTYPE a [<!ENTITY e 'x'>]><a>&e;&e;&e;</a>", &options).unwrap_err();
        assert!(matches!(err, Error::ExpansionCount { limit: 2, .. }), "{}", err);
    }

    #[test]
    fn test_external_subset_target() {
        let options = ParseOptions::default().target(Target::ExtSubset);
        let doc = parse("<?xml encoding='UTF-8'?><!ELEMENT a (#PCDATA)><!ENTITY % p '<!ELEMENT b ANY>'>%p;", &options)
            .unwrap();
        assert!(doc.dtd.elements.contains_key("a"));
        assert!(doc.dtd.elements.contains_key("b"));
        assert_eq!(doc.root_element_id(), None);
    }

    struct MapAsync(HashMap<String, Vec<u8>>);

    impl AsyncResolver for MapAsync {
        async fn resolve(&mut self, request: &DerefRequest) -> Result<Resource> {
            assert_eq!(request.kind, DerefKind::Dtd);
            self.0
                .get(&request.system_id)
                .map(|bytes| Resource::bytes(bytes.clone()))
                .ok_or_else(|| Error::InvalidResource(request.system_id.clone()))
        }
    }

    #[test]
    fn test_parse_async() {
        let mut resolver = MapAsync(resources(&[("a.dtd", "<!ATTLIST a v CDATA 'dflt'>")]));
        let options = ParseOptions::default();
        let doc = block_on(parse_async("<!DOCTYPE a SYSTEM 'a.dtd'><a/>", &options, &mut resolver)).unwrap();
        let root = doc.root_element_id().unwrap();
        assert_eq!(doc.get_attribute(root, "v"), Some("dflt"));
    }

    #[test]
    fn test_explicit_encoding_validated_up_front() {
        let options = ParseOptions::default().encoding("no-such-encoding");
        let err = parse("<a/>", &options).unwrap_err();
        assert!(matches!(err, Error::UnknownEncoding(_)), "{}", err);
    }
}
