use courier_foundation::{TemplateError, TemplateParser, TemplateRequest};
use courier_kernel::Requirements;
use parking_lot::Mutex;
use std::sync::Arc;

/// A parser that renders every template to the same text and records the
/// paths it was asked to parse.
#[derive(Clone)]
pub struct StaticParser {
    name: String,
    output: String,
    requirements: Requirements,
    pub parsed: Arc<Mutex<Vec<String>>>,
}

impl StaticParser {
    pub fn new(name: &str, output: &str) -> Self {
        Self {
            name: name.to_string(),
            output: output.to_string(),
            requirements: Requirements::default(),
            parsed: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn with_requirements(mut self, requirements: Requirements) -> Self {
        self.requirements = requirements;
        self
    }

    pub fn parsed_paths(&self) -> Vec<String> {
        self.parsed.lock().clone()
    }
}

impl TemplateParser for StaticParser {
    fn name(&self) -> &str {
        &self.name
    }

    fn parse(&self, request: &TemplateRequest) -> Result<String, TemplateError> {
        self.parsed.lock().push(request.path.to_string());
        Ok(self.output.clone())
    }

    fn requirements(&self) -> Requirements {
        self.requirements.clone()
    }
}
