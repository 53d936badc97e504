use serde_json::{json, Value};

use super::{FnTool, ToolError, ToolRegistry};

/// Static personal facts plus a railroad statistics pass-through.
/// Nothing here performs I/O.
#[derive(Debug, Clone, Copy, Default)]
pub struct InformationDesk;

impl InformationDesk {
    pub fn get_my_name(&self) -> &'static str {
        "I am Kavitha"
    }

    pub fn get_my_age(&self) -> &'static str {
        "I am 30 years old "
    }

    pub fn get_my_hobbies(&self) -> &'static str {
        "I like sketching and reading books. I enjoy playing with young kids and teaching them about the world."
    }

    /// Returns the supplied count unchanged; an absent count stays absent.
    pub fn get_railroad_employee_counts(
        &self,
        employee_count: Option<i64>,
        _state: Option<&str>,
        _month: Option<&str>,
        _year: Option<&str>,
    ) -> Option<i64> {
        employee_count
    }

    /// Register the whole catalog under the names the model sees.
    pub fn register_into(self, registry: &mut ToolRegistry) {
        registry
            .register(FnTool::nullary(
                "getMyName",
                "This tool will give you my name",
                move || json!(self.get_my_name()),
            ))
            .register(FnTool::nullary(
                "getMyAge",
                "This tool will give you my age",
                move || json!(self.get_my_age()),
            ))
            .register(FnTool::nullary(
                "getMyHobbies",
                "This tool will give you how I spend my time",
                move || json!(self.get_my_hobbies()),
            ))
            .register(FnTool::new(
                "getRailroadEmployeeCounts",
                "This tool will give you information about railroad employees counts in a given month, year, state. Use rrb.gov website to get the information about railroad employee counts. This has information only up to 2023",
                json!({
                    "type": "object",
                    "properties": {
                        "employeeCount": { "type": ["integer", "null"] },
                        "state": { "type": ["string", "null"] },
                        "month": { "type": ["string", "null"] },
                        "year": { "type": ["string", "null"] }
                    },
                    "required": ["employeeCount", "state", "month", "year"]
                }),
                move |args| {
                    let employee_count = optional_i64(args, "employeeCount")?;
                    let state = optional_str(args, "state")?;
                    let month = optional_str(args, "month")?;
                    let year = optional_str(args, "year")?;

                    Ok(json!(self.get_railroad_employee_counts(
                        employee_count,
                        state,
                        month,
                        year
                    )))
                },
            ));
    }

    pub fn registry() -> ToolRegistry {
        let mut registry = ToolRegistry::new();
        InformationDesk.register_into(&mut registry);
        registry
    }
}

fn optional_i64(args: &Value, key: &str) -> Result<Option<i64>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_i64()
            .map(Some)
            .ok_or_else(|| ToolError::InvalidArguments(format!("{} must be an integer", key))),
    }
}

fn optional_str<'a>(args: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match args.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => value
            .as_str()
            .map(Some)
            .ok_or_else(|| ToolError::InvalidArguments(format!("{} must be a string", key))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_static_answers() {
        let desk = InformationDesk;
        assert_eq!(desk.get_my_name(), "I am Kavitha");
        assert_eq!(desk.get_my_age(), "I am 30 years old ");
        assert_eq!(
            desk.get_my_hobbies(),
            "I like sketching and reading books. I enjoy playing with young kids and teaching them about the world."
        );
    }

    #[test]
    fn test_railroad_counts_pass_through() {
        let desk = InformationDesk;
        assert_eq!(
            desk.get_railroad_employee_counts(Some(100), Some("California"), Some("January"), Some("2023")),
            Some(100)
        );
    }

    #[test]
    fn test_railroad_counts_null_in_null_out() {
        let desk = InformationDesk;
        assert_eq!(desk.get_railroad_employee_counts(None, None, None, None), None);
    }

    #[test]
    fn test_catalog_names_and_descriptions() {
        let registry = InformationDesk::registry();
        let declarations = registry.declarations();
        let names: Vec<&str> = declarations.iter().map(|d| d.name.as_str()).collect();

        assert_eq!(
            names,
            vec!["getMyName", "getMyAge", "getMyHobbies", "getRailroadEmployeeCounts"]
        );
        assert!(declarations.iter().all(|d| !d.description.is_empty()));
    }

    #[test]
    fn test_registry_invocation() {
        let registry = InformationDesk::registry();

        assert_eq!(registry.invoke("getMyName", "{}"), "\"I am Kavitha\"");
        assert_eq!(
            registry.invoke(
                "getRailroadEmployeeCounts",
                r#"{"employeeCount":null,"state":null,"month":null,"year":null}"#
            ),
            "null"
        );
        assert_eq!(
            registry.invoke("getRailroadEmployeeCounts", r#"{"employeeCount":42,"state":"Ohio"}"#),
            "42"
        );
        assert!(registry
            .invoke("getRailroadEmployeeCounts", r#"{"employeeCount":"many"}"#)
            .starts_with("Error: invalid arguments"));
    }
}
