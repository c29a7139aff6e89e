//! WASM bindings for the branchflow-core library.
//!
//! A `FlowSession` owns one diagram session. Every method returns the
//! current graph as a JSON `GraphOutput` string for the canvas to render.

use wasm_bindgen::prelude::*;

use crate::config::EngineConfig;
use crate::engine::FlowEngine;
use crate::graph::{NodeId, NodeKind, PointF};
use crate::output::{legend, ErrorInfo, GraphOutput};

const SERIALIZATION_FALLBACK: &str =
    r#"{"error": {"code": "internal", "message": "serialization error"}}"#;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_namespace = console, js_name = error)]
    pub fn console_error(s: &str);
}

#[wasm_bindgen]
pub struct FlowSession {
    engine: FlowEngine,
}

#[wasm_bindgen]
impl FlowSession {
    /// `config_json` may be empty or a partial `EngineConfig` object.
    #[wasm_bindgen(constructor)]
    pub fn new(config_json: &str) -> FlowSession {
        let config = match EngineConfig::from_json(config_json) {
            Ok(config) => config,
            Err(e) => {
                console_error(&format!("Invalid config, using defaults: {}", e));
                EngineConfig::default()
            }
        };
        FlowSession {
            engine: FlowEngine::new(config),
        }
    }

    pub fn add_node(&mut self, kind: &str, x: f64, y: f64) -> String {
        match kind.parse::<NodeKind>() {
            Ok(kind) => {
                self.engine.add_node(kind, PointF { x, y });
                self.render(None)
            }
            Err(e) => self.fail("bad_request", e.to_string()),
        }
    }

    /// Add a node somewhere in the top-left half of the browser window.
    pub fn add_node_scattered(&mut self, kind: &str) -> String {
        let (w, h) = window_size();
        let x = js_sys::Math::random() * w * 0.5;
        let y = js_sys::Math::random() * h * 0.5;
        self.add_node(kind, x, y)
    }

    pub fn connect(&mut self, source: &str, target: &str) -> String {
        let (source, target) = match (source.parse::<NodeId>(), target.parse::<NodeId>()) {
            (Ok(s), Ok(t)) => (s, t),
            (Err(e), _) | (_, Err(e)) => return self.fail("bad_request", e.to_string()),
        };

        match self.engine.connect(source, target) {
            Ok(_) => self.render(None),
            Err(rejection) => self.render(Some(ErrorInfo::from(&rejection))),
        }
    }

    pub fn move_node(&mut self, id: &str, x: f64, y: f64) -> String {
        match id.parse::<NodeId>() {
            Ok(id) => {
                if self.engine.move_node(id, PointF { x, y }).is_none() {
                    console_error(&format!("Node '{}' not found", id));
                }
                self.render(None)
            }
            Err(e) => self.fail("bad_request", e.to_string()),
        }
    }

    pub fn delete_node(&mut self, id: &str) -> String {
        match id.parse::<NodeId>() {
            Ok(id) => {
                if self.engine.delete_node(id).is_none() {
                    console_error(&format!("Node '{}' not found", id));
                }
                self.render(None)
            }
            Err(e) => self.fail("bad_request", e.to_string()),
        }
    }

    pub fn undo(&mut self) -> String {
        self.engine.undo();
        self.render(None)
    }

    pub fn redo(&mut self) -> String {
        self.engine.redo();
        self.render(None)
    }

    /// Lay levels out as centred rows inside `container_width`.
    pub fn equispace(&mut self, container_width: f64) -> String {
        self.engine.layout_equispaced(container_width);
        self.render(None)
    }

    pub fn snapshot(&self) -> String {
        self.render(None)
    }

    /// Returns a JSON array of `{ name, color }`.
    pub fn legend(&self) -> String {
        serde_json::to_string(&legend(&self.engine.config().palette))
            .unwrap_or_else(|_| "[]".to_string())
    }
}

impl FlowSession {
    fn render(&self, error: Option<ErrorInfo>) -> String {
        let mut output = GraphOutput::new(
            self.engine.snapshot(),
            self.engine.history(),
            &self.engine.config().palette,
        );
        if let Some(error) = error {
            output = output.with_error(error);
        }
        serde_json::to_string(&output).unwrap_or_else(|e| {
            console_error(&format!("Error serializing graph: {}", e));
            SERIALIZATION_FALLBACK.to_string()
        })
    }

    fn fail(&self, code: &str, message: String) -> String {
        console_error(&message);
        self.render(Some(ErrorInfo {
            code: code.to_string(),
            message,
        }))
    }
}

fn window_size() -> (f64, f64) {
    web_sys::window()
        .map(|w| {
            let width = w.inner_width().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
            let height = w.inner_height().ok().and_then(|v| v.as_f64()).unwrap_or(0.0);
            (width, height)
        })
        .unwrap_or((0.0, 0.0))
}
