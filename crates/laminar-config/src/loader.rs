//! YAML loading for pipeline definitions.

use std::path::Path;

use laminar_types::{LaminarError, Result};

use crate::schema::PipelineDefinition;

/// Parse a pipeline definition from a YAML string.
///
/// JSON documents parse too, since every JSON document is valid YAML.
pub fn parse(source: &str) -> Result<PipelineDefinition> {
    let def: PipelineDefinition = serde_yaml::from_str(source)?;
    Ok(def)
}

/// Load a pipeline definition from a file.
pub fn load(path: &Path) -> Result<PipelineDefinition> {
    let source = std::fs::read_to_string(path).map_err(|e| {
        LaminarError::ConfigError(format!("cannot read '{}': {}", path.display(), e))
    })?;
    let def = parse(&source)?;
    tracing::debug!(
        pipeline = %def.pipeline_name,
        layers = def.layers.len(),
        gates = def.quality_gates.len(),
        "Loaded pipeline definition"
    );
    Ok(def)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::GateOperator;

    const FULL_DOC: &str = r#"
pipeline_name: governance-nightly
version: "2"
layers:
  - id: 1
    name: static-checks
    parallel: true
    tools:
      - name: lint
        script: run-lint.sh
        args: ["--all"]
      - name: audit
        script: run-audit.sh
        optional: true
  - id: 2
    name: docs
    dependencies: [1]
    delay_seconds: 3
    tools:
      - name: doc_checker
        script: check-docs.sh
execution:
  timeout_seconds: 120
  max_parallel: 8
  continue_on_failure: false
  state_file: .laminar/state.json
quality_gates:
  - name: doc-pass-rate
    source: "2.doc_checker"
    metric: pass_rate
    operator: ">="
    threshold: 95
rollback:
  enabled: true
  on_failure_at_layers: [2]
  actions:
    - name: restore
      script: restore.sh
notifications:
  on_failure:
    - level: error
      message: "pipeline failed at layer {layer_id}"
"#;

    #[test]
    fn parse_full_document() {
        let def = parse(FULL_DOC).unwrap();
        assert_eq!(def.pipeline_name, "governance-nightly");
        assert_eq!(def.version, "2");
        assert_eq!(def.layers.len(), 2);

        let first = &def.layers[0];
        assert!(first.parallel);
        assert_eq!(first.tools.len(), 2);
        assert_eq!(first.tools[0].args, vec!["--all".to_string()]);
        assert!(first.tools[1].optional);

        let second = &def.layers[1];
        assert_eq!(second.dependencies, vec![1]);
        assert_eq!(second.delay_seconds, 3);

        assert_eq!(def.execution.timeout_seconds, 120);
        assert_eq!(def.execution.max_parallel, 8);
        assert_eq!(
            def.execution.state_file,
            std::path::PathBuf::from(".laminar/state.json")
        );

        assert_eq!(def.quality_gates.len(), 1);
        assert_eq!(def.quality_gates[0].operator, GateOperator::Gte);
        assert_eq!(def.quality_gates[0].threshold, 95.0);

        assert!(def.rollback.enabled);
        assert_eq!(def.rollback.actions.len(), 1);

        assert_eq!(def.notifications.on_failure.len(), 1);
        assert_eq!(def.notifications.on_failure[0].level, "error");
    }

    #[test]
    fn parse_minimal_document_uses_defaults() {
        let def = parse(
            r#"
pipeline_name: tiny
layers:
  - id: 1
    name: only
    tools:
      - name: t
        script: t.sh
"#,
        )
        .unwrap();
        assert_eq!(def.version, "");
        assert_eq!(def.execution.timeout_seconds, 300);
        assert!(!def.layers[0].parallel);
        assert!(!def.layers[0].always_run);
        assert!(def.quality_gates.is_empty());
        assert!(!def.rollback.enabled);
        assert!(def.notifications.on_success.is_empty());
    }

    #[test]
    fn parse_rejects_missing_required_fields() {
        // No layers key at all.
        assert!(parse("pipeline_name: broken").is_err());
        // Tool without a script.
        let err = parse(
            r#"
pipeline_name: broken
layers:
  - id: 1
    name: bad
    tools:
      - name: t
"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn parse_accepts_json_document() {
        let def = parse(
            r#"{"pipeline_name": "as-json", "layers": [{"id": 1, "name": "l", "tools": []}]}"#,
        )
        .unwrap();
        assert_eq!(def.pipeline_name, "as-json");
    }

    #[test]
    fn load_missing_file_is_config_error() {
        let err = load(Path::new("/nonexistent/pipeline.yaml")).unwrap_err();
        assert!(matches!(err, LaminarError::ConfigError(_)));
        assert!(err.is_fatal_at_startup());
    }

    #[test]
    fn load_round_trips_through_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.yaml");
        std::fs::write(&path, FULL_DOC).unwrap();

        let def = load(&path).unwrap();
        assert_eq!(def.pipeline_name, "governance-nightly");
    }
}
