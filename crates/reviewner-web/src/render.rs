//! HTML rendering of an annotated document, one `<mark>` per entity.

use std::collections::BTreeMap;

use minijinja::{context, Environment};
use reviewner_config::ServerConfig;
use reviewner_ner::{AnnotatedDoc, Segment};
use serde::Serialize;

use crate::Result;

const ENT_TEMPLATE: &str = include_str!("templates/ent.html");

#[derive(Debug, Clone, Default)]
pub struct RenderOptions {
    pub title: String,
    /// Per-label colour overrides; unlisted labels use the type's default.
    pub colors: BTreeMap<String, String>,
}

impl From<&ServerConfig> for RenderOptions {
    fn from(config: &ServerConfig) -> Self {
        Self {
            title: config.title.clone(),
            colors: config.colors.clone(),
        }
    }
}

#[derive(Serialize)]
struct SegmentView<'a> {
    lines: Vec<&'a str>,
    label: Option<&'a str>,
    color: Option<&'a str>,
    score: Option<String>,
}

/// Render the document as a standalone HTML page. Text is escaped.
pub fn render_entities(doc: &AnnotatedDoc, options: &RenderOptions) -> Result<String> {
    let segments: Vec<SegmentView<'_>> = doc
        .segments()
        .into_iter()
        .map(|segment| match segment {
            Segment::Plain(text) => SegmentView {
                lines: text.split('\n').collect(),
                label: None,
                color: None,
                score: None,
            },
            Segment::Entity(entity) => SegmentView {
                lines: doc.text[entity.start..entity.end].split('\n').collect(),
                label: Some(entity.label.as_str()),
                color: Some(
                    options
                        .colors
                        .get(&entity.label)
                        .map(String::as_str)
                        .unwrap_or_else(|| entity.entity_type().default_color()),
                ),
                score: Some(format!("{:.2}", entity.score)),
            },
        })
        .collect();

    let mut env = Environment::new();
    env.add_template("ent.html", ENT_TEMPLATE)?;
    let page = env.get_template("ent.html")?.render(context! {
        title => &options.title,
        segments => segments,
        entity_count => doc.ents.len(),
        labels => doc.labels(),
    })?;
    Ok(page)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reviewner_ner::EntitySpan;

    fn doc(text: &str, spans: &[(usize, usize, &str)]) -> AnnotatedDoc {
        let ents = spans
            .iter()
            .map(|&(start, end, label)| EntitySpan {
                start,
                end,
                label: label.to_string(),
                score: 0.9,
                text: text[start..end].to_string(),
            })
            .collect();
        AnnotatedDoc::new(text, ents)
    }

    #[test]
    fn test_entities_are_marked_with_label_and_color() {
        let page = render_entities(
            &doc("Bought a Kindle from Amazon.", &[(21, 27, "ORG")]),
            &RenderOptions::default(),
        )
        .unwrap();

        assert!(page.contains(r#"<mark class="entity" style="background: #7aecec""#));
        assert!(page.contains(r#"Amazon<span class="entity-label">ORG</span></mark>"#));
        assert!(page.contains("Bought a Kindle from "));
        assert!(page.contains("ORG (0.90)"));
        assert!(page.contains("1 entities: ORG"));
    }

    #[test]
    fn test_color_overrides_apply_per_label() {
        let mut options = RenderOptions::default();
        options.colors.insert("PRODUCT".into(), "#123456".into());
        let page = render_entities(&doc("Kindle", &[(0, 6, "PRODUCT")]), &options).unwrap();
        assert!(page.contains("background: #123456"));
    }

    #[test]
    fn test_unknown_labels_use_fallback_color() {
        let page = render_entities(&doc("Zzz", &[(0, 3, "BRAND")]), &RenderOptions::default()).unwrap();
        assert!(page.contains("background: #ddd"));
    }

    #[test]
    fn test_text_is_escaped_and_newlines_break() {
        let page = render_entities(
            &doc("<b>hi</b>\nsecond line", &[]),
            &RenderOptions { title: "t".into(), ..Default::default() },
        )
        .unwrap();
        assert!(!page.contains("<b>hi</b>"));
        assert!(page.contains("&lt;b&gt;hi&lt;"));
        assert!(page.contains("<br>second line"));
        assert!(page.contains("<title>t</title>"));
        assert!(page.contains("0 entities</p>"));
    }
}
