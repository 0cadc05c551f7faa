//! Terminal-state notifications: template expansion and leveled emission.

use std::collections::HashMap;

use laminar_config::NotificationSpec;

/// Expand `{key}` placeholders in a template.
///
/// Placeholders without a matching key are left as-is.
pub fn expand_template(template: &str, vars: &HashMap<String, String>) -> String {
    let mut result = template.to_string();
    for (key, value) in vars {
        let pattern = format!("{{{}}}", key);
        result = result.replace(&pattern, value);
    }
    result
}

/// Emit one notification through `tracing` at its configured level.
///
/// Unknown levels fall back to `info` (validation has already warned).
pub fn emit_notification(spec: &NotificationSpec, vars: &HashMap<String, String>) {
    let message = expand_template(&spec.message, vars);
    match spec.level.to_lowercase().as_str() {
        "error" => tracing::error!(target: "laminar::notify", "{}", message),
        "warn" => tracing::warn!(target: "laminar::notify", "{}", message),
        "debug" => tracing::debug!(target: "laminar::notify", "{}", message),
        "trace" => tracing::trace!(target: "laminar::notify", "{}", message),
        _ => tracing::info!(target: "laminar::notify", "{}", message),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn expand_single_placeholder() {
        let v = vars(&[("layer_id", "3")]);
        assert_eq!(
            expand_template("failed at layer {layer_id}", &v),
            "failed at layer 3"
        );
    }

    #[test]
    fn expand_multiple_placeholders() {
        let v = vars(&[("layer_id", "2"), ("pipeline_name", "nightly")]);
        assert_eq!(
            expand_template("{pipeline_name}: rollback after layer {layer_id}", &v),
            "nightly: rollback after layer 2"
        );
    }

    #[test]
    fn unknown_placeholder_left_as_is() {
        let v = vars(&[("layer_id", "1")]);
        assert_eq!(expand_template("{unknown} at {layer_id}", &v), "{unknown} at 1");
    }

    #[test]
    fn repeated_placeholder_expands_everywhere() {
        let v = vars(&[("layer_id", "5")]);
        assert_eq!(expand_template("{layer_id}-{layer_id}", &v), "5-5");
    }

    #[test]
    fn empty_template() {
        assert_eq!(expand_template("", &vars(&[("k", "v")])), "");
    }

    #[test]
    fn emit_does_not_panic_on_unknown_level() {
        let spec = NotificationSpec {
            level: "shout".into(),
            message: "done".into(),
        };
        emit_notification(&spec, &HashMap::new());
    }
}
