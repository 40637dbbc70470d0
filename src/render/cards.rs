use serde_json::Value;

/// Text a renderer produced for one dashboard category.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardContent {
    pub title: String,
    pub body: String,
}

impl CardContent {
    pub fn new(title: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            body: body.into(),
        }
    }

    /// Flattened text used for change detection.
    pub fn as_text(&self) -> String {
        format!("{}\n{}", self.title, self.body)
    }
}

pub type CardRenderer = Box<dyn Fn(&Value) -> Option<CardContent> + Send + Sync>;

/// Pure renderers keyed by category, applied in registration order.
#[derive(Default)]
pub struct RendererRegistry {
    renderers: Vec<(String, CardRenderer)>,
}

impl RendererRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `render` for `category`, replacing any earlier renderer for it.
    pub fn register<F>(&mut self, category: impl Into<String>, render: F) -> &mut Self
    where
        F: Fn(&Value) -> Option<CardContent> + Send + Sync + 'static,
    {
        let category = category.into();
        let boxed: CardRenderer = Box::new(render);
        match self.renderers.iter_mut().find(|(id, _)| *id == category) {
            Some(slot) => slot.1 = boxed,
            None => self.renderers.push((category, boxed)),
        }
        self
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.renderers.iter().map(|(id, _)| id.as_str())
    }

    pub fn len(&self) -> usize {
        self.renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.renderers.is_empty()
    }

    /// Run every renderer against `snapshot[category]`. Missing, null and
    /// declined categories are left out.
    pub fn render_all(&self, snapshot: &Value) -> Vec<(String, CardContent)> {
        self.renderers
            .iter()
            .filter_map(|(category, render)| {
                let data = snapshot.get(category).filter(|value| !value.is_null())?;
                render(data).map(|content| (category.clone(), content))
            })
            .collect()
    }
}

/// Schema-agnostic renderer: strings verbatim, arrays one line per item,
/// objects as `key: value` lines. Empty arrays and objects render nothing.
pub fn summary_renderer(
    title: impl Into<String>,
) -> impl Fn(&Value) -> Option<CardContent> + Send + Sync + 'static {
    let title = title.into();
    move |value: &Value| {
        let lines = summarize(value);
        if lines.is_empty() {
            return None;
        }
        Some(CardContent::new(title.clone(), lines.join("\n")))
    }
}

fn summarize(value: &Value) -> Vec<String> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.iter().map(inline).collect(),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{key}: {}", inline(value)))
            .collect(),
        other => vec![inline(other)],
    }
}

fn inline(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items.iter().map(inline).collect::<Vec<_>>().join(", "),
        Value::Object(map) => map
            .iter()
            .map(|(key, value)| format!("{key}={}", inline(value)))
            .collect::<Vec<_>>()
            .join(" "),
        other => other.to_string(),
    }
}
