//! Output path interpolation
//!
//! Resolves templated output declarations such as `{projectRoot}/dist` or
//! `{workspaceRoot}/dist/{projectName}` against a per-task context. Paths are
//! produced relative to the workspace root.

use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde::Serialize;
use serde_json::Value;

use orbiter_core::project::target::TargetOptions;
use orbiter_core::{ProjectConfiguration, ProjectGraphNode};

/// Token that may only open a template
pub const WORKSPACE_ROOT_TOKEN: &str = "{workspaceRoot}";

/// Token that may only open a template when the project lives at the workspace root
pub const PROJECT_ROOT_TOKEN: &str = "{projectRoot}";

/// Matches a `{dotted.path}` expression, lazily
static EXPRESSION_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{([\s\S]+?)\}").expect("Invalid regex"));

/// Project data exposed to templates under `project`, with the name merged in
#[derive(Debug, Clone, Serialize)]
pub struct LegacyProject<'a> {
    /// Project name
    pub name: &'a str,
    /// Project configuration
    #[serde(flatten)]
    pub data: &'a ProjectConfiguration,
}

/// Values a template may refer to
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InterpolationContext<'a> {
    /// Project root relative to the workspace root
    pub project_root: &'a str,
    /// Project name
    pub project_name: &'a str,
    /// Legacy alias for the whole project
    #[serde(skip_serializing_if = "Option::is_none")]
    pub project: Option<LegacyProject<'a>>,
    /// Effective target options
    pub options: &'a TargetOptions,
}

impl<'a> InterpolationContext<'a> {
    /// Create a context with only a project root, a name and options
    pub fn new(project_root: &'a str, project_name: &'a str, options: &'a TargetOptions) -> Self {
        Self {
            project_root,
            project_name,
            project: None,
            options,
        }
    }

    /// Create the full context for a project node
    pub fn for_node(node: &'a ProjectGraphNode, options: &'a TargetOptions) -> Self {
        Self {
            project_root: &node.data.root,
            project_name: &node.name,
            project: Some(LegacyProject {
                name: &node.name,
                data: &node.data,
            }),
            options,
        }
    }

    fn is_workspace_level(&self) -> bool {
        self.project_root == "."
    }
}

/// Interpolate `template` against `context`.
///
/// `{workspaceRoot}` may only appear at the very start of a template, and so
/// may `{projectRoot}` when the project root is `"."`. A leading
/// `{workspaceRoot}/` is dropped, as is a leading `{projectRoot}/` for
/// workspace-level projects. Every other `{a.b.c}` expression is resolved by
/// walking the context; expressions that cannot be resolved are kept verbatim.
pub fn interpolate(template: &str, context: &InterpolationContext<'_>) -> Result<String, InterpolationError> {
    if appears_after_start(template, WORKSPACE_ROOT_TOKEN) {
        return Err(InterpolationError::InvalidPlacement {
            template: template.to_string(),
            token: WORKSPACE_ROOT_TOKEN,
            reason: "it can only be used at the beginning of the expression",
        });
    }

    if context.is_workspace_level() && appears_after_start(template, PROJECT_ROOT_TOKEN) {
        return Err(InterpolationError::InvalidPlacement {
            template: template.to_string(),
            token: PROJECT_ROOT_TOKEN,
            reason: "when {projectRoot} is '.', it can only be used at the beginning of the expression",
        });
    }

    let mut res = template.replacen("{workspaceRoot}/", "", 1);
    if context.is_workspace_level() {
        res = res.replacen("{projectRoot}/", "", 1);
    }

    // Serializing the typed context gives one uniform tree to walk.
    let data = serde_json::to_value(context)
        .map_err(|e| InterpolationError::Context(e.to_string()))?;

    let resolved = EXPRESSION_REGEX.replace_all(&res, |caps: &Captures<'_>| {
        let expression = caps[1].trim();
        match lookup(&data, expression) {
            Some(value) => render(value),
            None => caps[0].to_string(),
        }
    });

    Ok(resolved.into_owned())
}

/// Whether `token` occurs anywhere but at index 0
fn appears_after_start(template: &str, token: &str) -> bool {
    template.match_indices(token).any(|(idx, _)| idx > 0)
}

/// Walk a dotted path; any missing or falsy segment aborts the lookup
fn lookup<'v>(data: &'v Value, expression: &str) -> Option<&'v Value> {
    let mut value = data;
    for segment in expression.split('.') {
        let next = match value {
            Value::Object(map) => map.get(segment),
            Value::Array(items) => segment.parse::<usize>().ok().and_then(|i| items.get(i)),
            _ => None,
        }?;
        if !is_truthy(next) {
            return None;
        }
        value = next;
    }
    Some(value)
}

pub(crate) fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Render a resolved value as template text
pub(crate) fn render(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Array(items) => items.iter().map(render).collect::<Vec<_>>().join(","),
        Value::Object(_) => "[object Object]".to_string(),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

/// Errors raised while interpolating an output template
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum InterpolationError {
    /// A root token was used somewhere other than the start of the template
    #[error("Output '{template}' is invalid. {token}: {reason}.")]
    InvalidPlacement {
        template: String,
        token: &'static str,
        reason: &'static str,
    },

    /// The context could not be turned into a lookup tree
    #[error("Failed to build interpolation context: {0}")]
    Context(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use orbiter_core::TargetConfiguration;
    use serde_json::json;

    fn options(value: Value) -> TargetOptions {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    #[test]
    fn test_strips_leading_workspace_root() {
        let opts = TargetOptions::new();
        let ctx = InterpolationContext::new("apps/foo", "foo", &opts);
        assert_eq!(
            interpolate("{workspaceRoot}/dist/{projectName}", &ctx).unwrap(),
            "dist/foo"
        );
    }

    #[test]
    fn test_strips_project_root_for_root_project() {
        let opts = TargetOptions::new();
        let ctx = InterpolationContext::new(".", "root", &opts);
        assert_eq!(interpolate("{projectRoot}/build", &ctx).unwrap(), "build");
    }

    #[test]
    fn test_substitutes_project_root() {
        let opts = TargetOptions::new();
        let ctx = InterpolationContext::new("libs/ui", "ui", &opts);
        assert_eq!(
            interpolate("{projectRoot}/dist", &ctx).unwrap(),
            "libs/ui/dist"
        );
        assert_eq!(
            interpolate("coverage/{projectRoot}", &ctx).unwrap(),
            "coverage/libs/ui"
        );
    }

    #[test]
    fn test_missing_expression_left_unchanged() {
        let opts = TargetOptions::new();
        let ctx = InterpolationContext::new("x", "", &opts);
        assert_eq!(
            interpolate("a/{missing.key}/b", &ctx).unwrap(),
            "a/{missing.key}/b"
        );
    }

    #[test]
    fn test_resolves_options_path() {
        let opts = options(json!({ "outputPath": "dist/apps/web", "nested": { "dir": "out" } }));
        let ctx = InterpolationContext::new("apps/web", "web", &opts);
        assert_eq!(
            interpolate("{options.outputPath}", &ctx).unwrap(),
            "dist/apps/web"
        );
        assert_eq!(
            interpolate("{projectRoot}/{ options.nested.dir }", &ctx).unwrap(),
            "apps/web/out"
        );
    }

    #[test]
    fn test_falsy_option_left_unchanged() {
        let opts = options(json!({ "outputPath": "", "enabled": false }));
        let ctx = InterpolationContext::new("apps/web", "web", &opts);
        assert_eq!(
            interpolate("{options.outputPath}", &ctx).unwrap(),
            "{options.outputPath}"
        );
        assert_eq!(
            interpolate("x/{options.enabled}", &ctx).unwrap(),
            "x/{options.enabled}"
        );
    }

    #[test]
    fn test_unresolved_tokens_are_independent() {
        let opts = TargetOptions::new();
        let ctx = InterpolationContext::new("apps/web", "web", &opts);
        assert_eq!(
            interpolate("{projectRoot}/{options.missing}/{projectName}", &ctx).unwrap(),
            "apps/web/{options.missing}/web"
        );
    }

    #[test]
    fn test_workspace_root_mid_string_is_error() {
        let opts = TargetOptions::new();
        let ctx = InterpolationContext::new("apps/foo", "foo", &opts);
        let err = interpolate("foo/{workspaceRoot}/bar", &ctx).unwrap_err();
        assert!(err.to_string().contains("foo/{workspaceRoot}/bar"));
    }

    #[test]
    fn test_repeated_workspace_root_is_error() {
        let opts = TargetOptions::new();
        let ctx = InterpolationContext::new("apps/foo", "foo", &opts);
        assert!(interpolate("{workspaceRoot}/{workspaceRoot}", &ctx).is_err());
    }

    #[test]
    fn test_project_root_mid_string_for_root_project_is_error() {
        let opts = TargetOptions::new();
        let ctx = InterpolationContext::new(".", "root", &opts);
        assert!(interpolate("dist/{projectRoot}", &ctx).is_err());

        let ctx = InterpolationContext::new("apps/foo", "foo", &opts);
        assert!(interpolate("dist/{projectRoot}", &ctx).is_ok());
    }

    #[test]
    fn test_legacy_project_alias() {
        let node = ProjectGraphNode::new(
            "web",
            ProjectConfiguration::new("apps/web")
                .with_target("build", TargetConfiguration::new("nx:run-commands")),
        );
        let opts = TargetOptions::new();
        let ctx = InterpolationContext::for_node(&node, &opts);
        assert_eq!(
            interpolate("dist/{project.root}/{project.name}", &ctx).unwrap(),
            "dist/apps/web/web"
        );
    }

    #[test]
    fn test_context_serializes_to_lookup_tree() {
        let opts = options(json!({ "outputPath": "dist/web" }));
        let ctx = InterpolationContext::new("apps/web", "web", &opts);
        let data = serde_json::to_value(&ctx).unwrap();
        assert_eq!(
            data,
            json!({
                "projectRoot": "apps/web",
                "projectName": "web",
                "options": { "outputPath": "dist/web" },
            })
        );
    }

    #[test]
    fn test_renders_scalars_and_arrays() {
        let opts = options(json!({ "port": 4200, "langs": ["en", "fr"] }));
        let ctx = InterpolationContext::new("apps/web", "web", &opts);
        assert_eq!(
            interpolate("tmp/{options.port}/{options.langs}", &ctx).unwrap(),
            "tmp/4200/en,fr"
        );
        assert_eq!(
            interpolate("tmp/{options.langs.1}", &ctx).unwrap(),
            "tmp/fr"
        );
    }
}
