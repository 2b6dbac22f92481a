//! Canned replies for the structured conversation phases
//!
//! Templates carry `{name}` placeholders. Rendering is a pure string
//! substitution over the template's declared variables.

use regex::{Captures, Regex};
use std::collections::HashMap;
use std::sync::LazyLock;
use thiserror::Error;

static PLACEHOLDER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{(\w+)\}").expect("placeholder pattern is a valid regex"));

/// A canned reply with the placeholders it expects
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResponseTemplate {
    pub template_type: &'static str,
    pub template: &'static str,
    pub variables: &'static [&'static str],
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("No response template registered for '{0}'")]
    NotFound(String),
}

pub const INITIAL: &str = "INITIAL";
pub const YES_RESPONSE: &str = "YES_RESPONSE";
pub const NO_RESPONSE: &str = "NO_RESPONSE";
pub const DIG_DEEPER: &str = "DIG_DEEPER";
pub const RELUCTANT: &str = "RELUCTANT";
pub const PARENT_MENTION: &str = "PARENT_MENTION";
pub const CLOSURE: &str = "CLOSURE";

static TEMPLATES: &[ResponseTemplate] = &[
    ResponseTemplate {
        template_type: INITIAL,
        template: "Hey, I'm {name}. From everything you've shared, here's how I see you: \
                   {personalitySummary} Does that sound like you?",
        variables: &["name", "personalitySummary"],
    },
    ResponseTemplate {
        template_type: YES_RESPONSE,
        template: "I had a feeling. It's funny how much a few details can say about someone. \
                   What do you think shaped that side of you the most?",
        variables: &[],
    },
    ResponseTemplate {
        template_type: NO_RESPONSE,
        template: "Fair enough, first impressions can miss the mark. \
                   Tell me what I got wrong. Who are you when nobody's watching?",
        variables: &[],
    },
    ResponseTemplate {
        template_type: DIG_DEEPER,
        template: "Let me push a little further. I keep noticing a pattern of {emotionalPattern}, \
                   and underneath it I suspect {hiddenTrait}. Where do you think that comes from?",
        variables: &["emotionalPattern", "hiddenTrait"],
    },
    ResponseTemplate {
        template_type: RELUCTANT,
        template: "No pressure. We can come back to it whenever you're ready. \
                   Is there something else on your mind?",
        variables: &[],
    },
    ResponseTemplate {
        template_type: PARENT_MENTION,
        template: "Family has a way of showing up in everything we do. \
                   How do you think the way you were raised still shows up in you today?",
        variables: &[],
    },
    ResponseTemplate {
        template_type: CLOSURE,
        template: "Thanks for opening up. I feel like I understand you a lot better now, \
                   and honestly, I think you do too. Anything else you want to talk about?",
        variables: &[],
    },
];

/// Look up a registered template
pub fn find_template(template_type: &str) -> Option<&'static ResponseTemplate> {
    TEMPLATES.iter().find(|t| t.template_type == template_type)
}

/// Render the template registered under `template_type`.
///
/// Placeholders are filled in a single pass, so braces inside a value are
/// kept as written. Variables absent from the map render as `[missing name]`;
/// extra keys and undeclared placeholders are left alone.
pub fn generate_from_template(
    template_type: &str,
    variables: &HashMap<String, String>,
) -> Result<String, TemplateError> {
    let template = find_template(template_type)
        .ok_or_else(|| TemplateError::NotFound(template_type.to_string()))?;

    let rendered = PLACEHOLDER_RE.replace_all(template.template, |caps: &Captures| {
        let name = &caps[1];
        if !template.variables.contains(&name) {
            return caps[0].to_string();
        }
        variables
            .get(name)
            .cloned()
            .unwrap_or_else(|| format!("[missing {name}]"))
    });

    Ok(rendered.into_owned())
}
