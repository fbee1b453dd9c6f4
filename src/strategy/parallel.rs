//! Parallel parsing of independent documents
//!
//! Uses Rayon to spread whole documents over the thread pool. Each document
//! gets its own pipeline; nothing is shared between parses except the
//! read-only resource map.

use std::collections::HashMap;

use rayon::prelude::*;

use crate::dom::Document;
use crate::error::Result;
use crate::gateway::MapResolver;
use crate::options::ParseOptions;
use crate::parser::Parser;

/// Parse every input with the same options, resolving external content from
/// `resources`
pub fn parse_parallel(
    inputs: &[&[u8]],
    options: &ParseOptions,
    resources: &HashMap<String, Vec<u8>>,
) -> Vec<Result<Document>> {
    inputs
        .par_iter()
        .map(|input| {
            Parser::new(options.clone())
                .resolver(MapResolver::new(resources))
                .parse(*input)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;

    #[test]
    fn test_parse_parallel() {
        let inputs: [&[u8]; 3] = [b"<a>1</a>", b"<b>2</b>", b"<c>3"];
        let results = parse_parallel(&inputs, &ParseOptions::default(), &HashMap::new());
        assert_eq!(results.len(), 3);
        assert_eq!(results[0].as_ref().map(|d| d.text(d.root_element_id().unwrap_or(0))).ok(), Some("1".to_string()));
        assert!(results[1].is_ok());
        assert!(matches!(results[2], Err(Error::Syntax(_))));
    }

    #[test]
    fn test_parallel_resources() {
        let mut resources = HashMap::new();
        resources.insert("e.txt".to_string(), b"shared".to_vec());
        let doc: &[u8] = b"<!DOCTYPE r [<!ENTITY e SYSTEM 'e.txt'>]><r>&e;</r>";
        let inputs = vec![doc; 4];
        let results = parse_parallel(&inputs, &ParseOptions::default(), &resources);
        for result in results {
            let doc = result.unwrap();
            assert_eq!(doc.text(doc.root_element_id().unwrap()), "shared");
        }
    }
}
