//! Per-block processing.
//!
//! [`GistProcessor`] takes the raw text of one `gist` code block, resolves
//! every reference line in parallel and appends one surface or one error
//! block per line to the output location, in input order.

use rayon::prelude::*;

use crate::dom::{Detached, OutputLocation};
use crate::reference::{Reference, parse};
use crate::resolver::{RemoteDocument, Resolver};
use crate::surface::{SurfaceId, SurfaceOptions, render_error, render_surface};

/// Result of processing one code block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BlockOutcome {
    /// Surfaces inserted, in input order.
    pub surfaces: Vec<SurfaceId>,
    /// Lines rendered as error blocks, in input order.
    pub failures: Vec<String>,
    /// The output location was destroyed before every result was inserted.
    pub detached: bool,
}

/// Outcome of resolving a single line.
enum LineResult {
    Resolved(Reference, RemoteDocument),
    Failed(String),
}

/// Renders the references of a code block.
#[derive(Clone)]
pub struct GistProcessor {
    resolver: Resolver,
    options: SurfaceOptions,
}

impl GistProcessor {
    /// Create a processor.
    pub fn new(resolver: Resolver, options: SurfaceOptions) -> Self {
        Self { resolver, options }
    }

    /// Surface options applied to every block.
    pub fn options(&self) -> &SurfaceOptions {
        &self.options
    }

    /// Process one block.
    ///
    /// Blank lines are skipped. A failing line never affects its siblings.
    /// Results are dropped once `output` is detached.
    pub fn process(&self, source: &str, output: &dyn OutputLocation) -> BlockOutcome {
        let lines: Vec<&str> = source
            .trim()
            .lines()
            .filter(|line| !line.trim().is_empty())
            .collect();

        let results = self.resolve_all(&lines);

        let mut outcome = BlockOutcome::default();
        for (line, result) in lines.into_iter().zip(results) {
            if let Err(Detached) = self.insert(output, line, result, &mut outcome) {
                tracing::debug!("Output location detached, dropping remaining gists");
                outcome.detached = true;
                break;
            }
        }
        outcome
    }

    /// Resolve every line concurrently, one worker per line.
    ///
    /// Lookups block on the network, so the block gets its own pool instead
    /// of queueing behind the global one.
    fn resolve_all(&self, lines: &[&str]) -> Vec<LineResult> {
        if lines.is_empty() {
            return Vec::new();
        }

        // Indexed parallel collect keeps input order.
        let resolve = || -> Vec<LineResult> {
            lines.par_iter().map(|line| self.resolve_line(line)).collect()
        };

        match rayon::ThreadPoolBuilder::new().num_threads(lines.len()).build() {
            Ok(pool) => pool.install(resolve),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to create thread pool, using the global pool");
                resolve()
            }
        }
    }

    fn resolve_line(&self, line: &str) -> LineResult {
        let reference = match parse(line) {
            Ok(reference) => reference,
            Err(e) => {
                tracing::warn!(line = %line, "Invalid gist reference");
                return LineResult::Failed(e.to_string());
            }
        };

        match self.resolver.resolve(&reference) {
            Ok(document) => LineResult::Resolved(reference, document),
            Err(e) => {
                tracing::warn!(gist = %reference, error = %e, "Failed to fetch gist");
                LineResult::Failed(format!(
                    "Could not fetch the Gist from GitHub server. (Error: {e})"
                ))
            }
        }
    }

    fn insert(
        &self,
        output: &dyn OutputLocation,
        line: &str,
        result: LineResult,
        outcome: &mut BlockOutcome,
    ) -> Result<(), Detached> {
        if !output.is_attached() {
            return Err(Detached);
        }
        match result {
            LineResult::Resolved(reference, document) => {
                let id = render_surface(output, &reference, &document, &self.options)?;
                outcome.surfaces.push(id);
            }
            LineResult::Failed(message) => {
                render_error(output, line, &message)?;
                outcome.failures.push(line.to_owned());
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};
    use std::time::{Duration, Instant};

    use super::*;
    use crate::document::HtmlDocument;
    use crate::dom::Element;
    use crate::resolver::{HttpClient, HttpResponse, TransportError};
    use pretty_assertions::assert_eq;

    /// Serves a fixed document for every URL except those containing `fail`.
    struct FakeClient {
        requests: Mutex<Vec<String>>,
    }

    impl HttpClient for FakeClient {
        fn get(&self, url: &str, _accept: &str) -> Result<HttpResponse, TransportError> {
            self.requests.lock().unwrap().push(url.to_owned());
            if url.contains("fail") {
                return Ok(HttpResponse {
                    status: 404,
                    body: String::new(),
                });
            }
            Ok(HttpResponse {
                status: 200,
                body: format!(r#"{{"div": "<div>{url}</div>", "stylesheet": "s.css"}}"#),
            })
        }
    }

    fn processor() -> (GistProcessor, Arc<FakeClient>) {
        let client = Arc::new(FakeClient {
            requests: Mutex::new(Vec::new()),
        });
        let resolver = Resolver::new("https://gist.github.com", Arc::clone(&client) as Arc<dyn HttpClient>);
        (GistProcessor::new(resolver, SurfaceOptions::default()), client)
    }

    #[test]
    fn test_single_reference() {
        let (processor, client) = processor();
        let document = HtmlDocument::new();
        let output = document.create_output();

        let outcome = processor.process("abc123\n", &output);

        assert_eq!(outcome.surfaces.len(), 1);
        assert!(outcome.failures.is_empty());
        assert!(!outcome.detached);
        assert_eq!(
            *client.requests.lock().unwrap(),
            vec!["https://gist.github.com/abc123.json".to_owned()]
        );
        assert_eq!(output.elements()[0].tag(), "iframe");
    }

    #[test]
    fn test_mixed_results_keep_input_order() {
        let (processor, _client) = processor();
        let document = HtmlDocument::new();
        let output = document.create_output();

        let outcome = processor.process("a1\nfail1\n!!!\nb2\nfail2", &output);

        assert_eq!(outcome.surfaces.len(), 2);
        assert_eq!(outcome.failures, vec!["fail1", "!!!", "fail2"]);
        let tags: Vec<String> = output
            .elements()
            .iter()
            .map(|e| e.tag().to_owned())
            .collect();
        assert_eq!(tags, vec!["iframe", "pre", "pre", "iframe", "pre"]);
        assert!(output.elements()[0].id().unwrap().contains("-a1-"));
        assert!(output.elements()[3].id().unwrap().contains("-b2-"));
    }

    #[test]
    fn test_blank_lines_are_skipped() {
        let (processor, client) = processor();
        let document = HtmlDocument::new();
        let output = document.create_output();

        let outcome = processor.process("\n\n  a1  \n\n   \nb2\n\n", &output);

        assert_eq!(outcome.surfaces.len(), 2);
        assert_eq!(client.requests.lock().unwrap().len(), 2);
    }

    #[test]
    fn test_empty_block() {
        let (processor, client) = processor();
        let document = HtmlDocument::new();
        let output = document.create_output();

        let outcome = processor.process("  \n ", &output);

        assert_eq!(outcome, BlockOutcome::default());
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_parse_failure_message() {
        let (processor, client) = processor();
        let document = HtmlDocument::new();
        let output = document.create_output();

        processor.process("???", &output);

        let text = output.elements()[0].text().unwrap().to_owned();
        assert!(text.starts_with("Failed to load the Gist (???)."));
        assert!(text.contains("Could not find a valid Gist ID"));
        assert!(client.requests.lock().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_failure_message() {
        let (processor, _client) = processor();
        let document = HtmlDocument::new();
        let output = document.create_output();

        processor.process("fail#main.py", &output);

        let text = output.elements()[0].text().unwrap().to_owned();
        assert!(text.contains("(fail#main.py)"));
        assert!(text.contains("Could not fetch the Gist from GitHub server."));
        assert!(text.contains("remote rejected request (HTTP 404)"));
    }

    #[test]
    fn test_detached_output_drops_results() {
        let (processor, _client) = processor();
        let document = HtmlDocument::new();
        let output = document.create_output();
        output.detach();

        let outcome = processor.process("a1\nb2", &output);

        assert!(outcome.detached);
        assert!(outcome.surfaces.is_empty());
        assert!(output.elements().is_empty());
    }

    /// Answers every lookup after a fixed delay.
    struct SlowClient {
        delay: Duration,
    }

    impl HttpClient for SlowClient {
        fn get(&self, url: &str, _accept: &str) -> Result<HttpResponse, TransportError> {
            std::thread::sleep(self.delay);
            Ok(HttpResponse {
                status: 200,
                body: format!(r#"{{"div": "<div>{url}</div>", "stylesheet": "s.css"}}"#),
            })
        }
    }

    #[test]
    fn test_lines_resolve_concurrently() {
        let delay = Duration::from_millis(200);
        let resolver = Resolver::new(
            "https://gist.github.com",
            Arc::new(SlowClient { delay }) as Arc<dyn HttpClient>,
        );
        let processor = GistProcessor::new(resolver, SurfaceOptions::default());
        let document = HtmlDocument::new();
        let output = document.create_output();
        let source: Vec<String> = (0..16).map(|i| format!("id{i}")).collect();

        let started = Instant::now();
        let outcome = processor.process(&source.join("\n"), &output);
        let elapsed = started.elapsed();

        assert_eq!(outcome.surfaces.len(), 16);
        // Sequential lookups would take 16 delays.
        assert!(elapsed < delay * 8, "block took {elapsed:?}");
        assert!(output.elements()[0].id().unwrap().contains("-id0-"));
        assert!(output.elements()[15].id().unwrap().contains("-id15-"));
    }

    /// Output that detaches itself after accepting `capacity` elements.
    struct ShortLivedOutput {
        capacity: usize,
        elements: Mutex<Vec<Element>>,
    }

    impl OutputLocation for ShortLivedOutput {
        fn is_attached(&self) -> bool {
            self.elements.lock().unwrap().len() < self.capacity
        }

        fn append(&self, element: Element) -> Result<(), Detached> {
            let mut elements = self.elements.lock().unwrap();
            if elements.len() >= self.capacity {
                return Err(Detached);
            }
            elements.push(element);
            Ok(())
        }
    }

    #[test]
    fn test_detach_midway_keeps_inserted_prefix() {
        let (processor, _client) = processor();
        let output = ShortLivedOutput {
            capacity: 1,
            elements: Mutex::new(Vec::new()),
        };

        let outcome = processor.process("a1\nb2\nc3", &output);

        assert!(outcome.detached);
        assert_eq!(outcome.surfaces.len(), 1);
        assert_eq!(output.elements.lock().unwrap().len(), 1);
    }
}
