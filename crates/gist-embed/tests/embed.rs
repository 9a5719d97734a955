//! End-to-end tests for the embedding pipeline against a fake gist service.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use gist_embed::{
    GistPlugin, GistSettings, HtmlDocument, HttpClient, HttpResponse, LocalMessageBus, MessageBus,
    MessageEvent, OutputLocation, SurfaceHost, TransportError, render_markdown,
};
use pretty_assertions::assert_eq;
use serde_json::json;

/// In-memory gist service keyed by full request URL.
#[derive(Default)]
struct FakeGistService {
    routes: HashMap<String, HttpResponse>,
    requests: Mutex<Vec<(String, String)>>,
}

impl FakeGistService {
    fn with_gist(mut self, url: &str, markup: &str) -> Self {
        let body = json!({
            "description": "fixture",
            "public": true,
            "created_at": "2020-05-01T10:00:00Z",
            "files": ["main.py"],
            "owner": "octocat",
            "div": markup,
            "stylesheet": "https://github.githubassets.com/assets/gist-embed-123.css",
        });
        self.routes.insert(
            url.to_owned(),
            HttpResponse {
                status: 200,
                body: body.to_string(),
            },
        );
        self
    }

    fn with_status(mut self, url: &str, status: u16) -> Self {
        self.routes.insert(
            url.to_owned(),
            HttpResponse {
                status,
                body: "Not Found".to_owned(),
            },
        );
        self
    }

    fn requested_urls(&self) -> Vec<String> {
        let mut urls: Vec<String> = self
            .requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect();
        urls.sort();
        urls
    }
}

impl HttpClient for FakeGistService {
    fn get(&self, url: &str, accept: &str) -> Result<HttpResponse, TransportError> {
        self.requests
            .lock()
            .unwrap()
            .push((url.to_owned(), accept.to_owned()));
        self.routes
            .get(url)
            .cloned()
            .ok_or_else(|| TransportError(format!("connection refused: {url}")))
    }
}

struct Harness {
    service: Arc<FakeGistService>,
    document: Arc<HtmlDocument>,
    bus: Arc<LocalMessageBus>,
    plugin: GistPlugin,
}

fn harness(service: FakeGistService) -> Harness {
    let service = Arc::new(service);
    let document = Arc::new(HtmlDocument::new());
    let bus = Arc::new(LocalMessageBus::new());
    let plugin = GistPlugin::new(
        &GistSettings::default(),
        Arc::clone(&service) as Arc<dyn HttpClient>,
        Arc::clone(&document) as Arc<dyn SurfaceHost>,
        Arc::clone(&bus) as Arc<dyn MessageBus>,
    );
    plugin.on_load();
    Harness {
        service,
        document,
        bus,
        plugin,
    }
}

fn height_report(surface_id: &str, height: u32) -> MessageEvent {
    MessageEvent {
        origin: "null".to_owned(),
        data: json!({
            "sender": "gist-embed",
            "surfaceID": surface_id,
            "contentHeight": height,
        }),
    }
}

#[test]
fn test_bare_identifier_renders_one_surface() {
    let h = harness(
        FakeGistService::default()
            .with_gist("https://gist.github.com/abc123.json", r#"<div class="gist">x</div>"#),
    );
    let output = h.document.create_output();

    let outcome = h.plugin.process_block("abc123", &output);

    assert_eq!(outcome.surfaces.len(), 1);
    assert_eq!(
        *h.service.requests.lock().unwrap(),
        vec![(
            "https://gist.github.com/abc123.json".to_owned(),
            "application/json".to_owned()
        )]
    );

    let elements = output.elements();
    assert_eq!(elements.len(), 1);
    let srcdoc = elements[0].attr("srcdoc").unwrap();
    assert!(srcdoc.contains(r#"<div class="gist">x</div>"#));
    assert!(srcdoc.contains("gist-embed-123.css"));
}

#[test]
fn test_filename_is_forwarded_as_query() {
    let h = harness(
        FakeGistService::default().with_gist(
            "https://gist.github.com/abc123.json?file=main.py",
            "<div>main</div>",
        ),
    );
    let output = h.document.create_output();

    let outcome = h.plugin.process_block("abc123#main.py", &output);

    assert_eq!(outcome.surfaces.len(), 1);
    assert_eq!(
        h.service.requested_urls(),
        vec!["https://gist.github.com/abc123.json?file=main.py"]
    );
}

#[test]
fn test_rejected_lookup_renders_error_block() {
    let h = harness(
        FakeGistService::default().with_status("https://gist.github.com/abc123.json?file=main.py", 404),
    );
    let output = h.document.create_output();

    let outcome = h.plugin.process_block("abc123#main.py", &output);

    assert!(outcome.surfaces.is_empty());
    assert_eq!(outcome.failures, vec!["abc123#main.py"]);
    let elements = output.elements();
    assert_eq!(elements.len(), 1);
    assert_eq!(elements[0].tag(), "pre");
    let text = elements[0].text().unwrap();
    assert!(text.contains("abc123#main.py"));
    assert!(text.contains("remote rejected request"));
}

#[test]
fn test_failing_sibling_does_not_block_others() {
    let h = harness(
        FakeGistService::default()
            .with_status("https://gist.github.com/id1.json", 500)
            .with_gist("https://gist.github.com/id2.json", "<div>two</div>"),
    );
    let output = h.document.create_output();

    let outcome = h.plugin.process_block("id1\nid2", &output);

    assert_eq!(outcome.failures, vec!["id1"]);
    assert_eq!(outcome.surfaces.len(), 1);
    let tags: Vec<String> = output.elements().iter().map(|e| e.tag().to_owned()).collect();
    assert_eq!(tags, vec!["pre", "iframe"]);
}

#[test]
fn test_n_references_k_failures() {
    let mut service = FakeGistService::default();
    let mut lines = Vec::new();
    for i in 0..12 {
        let id = format!("g{i}");
        let url = format!("https://gist.github.com/{id}.json");
        service = if i % 3 == 0 {
            service.with_status(&url, 404)
        } else {
            service.with_gist(&url, "<div></div>")
        };
        lines.push(id);
    }
    // Transport failure: no route at all.
    lines.push("unrouted".to_owned());
    let h = harness(service);
    let output = h.document.create_output();

    let outcome = h.plugin.process_block(&lines.join("\n"), &output);

    assert_eq!(outcome.failures.len(), 5);
    assert_eq!(outcome.surfaces.len(), 8);
    assert_eq!(output.elements().len(), 13);
    assert_eq!(h.service.requested_urls().len(), 13);
}

#[test]
fn test_surfaces_resize_through_the_bus() {
    let h = harness(
        FakeGistService::default()
            .with_gist("https://gist.github.com/a1.json", "<div>a</div>")
            .with_gist("https://gist.github.com/b2.json", "<div>b</div>"),
    );
    let output = h.document.create_output();
    let outcome = h.plugin.process_block("a1\nb2", &output);
    let first = outcome.surfaces[0].as_str();
    let second = outcome.surfaces[1].as_str();

    h.bus.post(&height_report(first, 240));
    h.bus.post(&height_report(first, 240));
    h.bus.post(&height_report("gist-embed-zzz-unknown", 999));

    let elements = output.elements();
    assert_eq!(elements[0].attr("height"), Some("240"));
    assert_eq!(elements[1].attr("height"), None);

    h.bus.post(&height_report(second, 75));
    assert_eq!(output.elements()[1].attr("height"), Some("75"));
}

#[test]
fn test_reports_ignored_after_unload() {
    let h = harness(
        FakeGistService::default().with_gist("https://gist.github.com/a1.json", "<div>a</div>"),
    );
    let output = h.document.create_output();
    let outcome = h.plugin.process_block("a1", &output);

    h.plugin.on_unload();
    h.bus.post(&height_report(outcome.surfaces[0].as_str(), 120));

    assert_eq!(output.elements()[0].attr("height"), None);
}

#[test]
fn test_detached_output_receives_nothing() {
    let h = harness(
        FakeGistService::default().with_gist("https://gist.github.com/a1.json", "<div>a</div>"),
    );
    let output = h.document.create_output();
    output.detach();

    let outcome = h.plugin.process_block("a1", &output);

    assert!(outcome.detached);
    assert!(!output.is_attached());
    assert!(output.elements().is_empty());
}

#[test]
fn test_markdown_document_end_to_end() {
    let h = harness(
        FakeGistService::default()
            .with_gist("https://gist.github.com/abc123.json", "<div>one</div>")
            .with_gist("https://gist.github.com/def456.json?file=b.rs", "<div>two</div>"),
    );
    let markdown = "\
# Snippets

```gist
https://gist.github.com/octocat/abc123
```

Between.

```gist
def456#b.rs
nothing-here!
```
";

    let result = render_markdown(markdown, &h.plugin, &h.document);

    assert_eq!(result.blocks.len(), 2);
    assert_eq!(result.surface_count(), 2);
    assert_eq!(result.failure_count(), 1);
    assert_eq!(result.html.matches("<iframe").count(), 2);
    assert!(result.html.contains("<p>Between.</p>"));

    let second = result.blocks[1].surfaces[0].as_str();
    h.bus.post(&height_report(second, 64));
    assert!(h.document.set_surface_height(second, 64));
}
