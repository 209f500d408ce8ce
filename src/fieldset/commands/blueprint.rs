use crate::catalog::Catalog;
use crate::commands::{schema_for, CmdResult};
use crate::error::Result;

pub fn run(catalog: &Catalog, model: &str) -> Result<CmdResult> {
    let schema = schema_for(catalog, model)?;
    Ok(CmdResult::default().with_output(schema.blueprint()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixtures;

    #[test]
    fn test_blueprint_lists_fields_in_order() {
        let res = run(&fixtures::catalog(), "Player").unwrap();
        let output = res.output.unwrap();
        assert_eq!(output["name"], "Player");
        let fields = output["fields"].as_object().unwrap();
        assert_eq!(
            fields.keys().collect::<Vec<_>>(),
            vec!["player_id", "score"]
        );
        assert_eq!(fields["score"]["constraints"]["maximum"], 10);
    }

    #[test]
    fn test_blueprint_unknown_model() {
        assert!(run(&fixtures::catalog(), "Referee").is_err());
    }
}
