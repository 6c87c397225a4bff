//! Xpath command handler

use crate::commands::XpathArgs;
use crate::error::CliResult;
use pagekit::LocatorQuery;

/// Build the XPath described by `args`
pub fn execute_xpath(args: &XpathArgs) -> CliResult<String> {
    let query = LocatorQuery::try_from(args.query_options()?)?;
    let xpath = query.to_xpath(args.scope.as_deref().filter(|s| !s.is_empty()))?;
    tracing::debug!(kind = %query.kind(), %xpath, "built xpath");
    Ok(xpath)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::error::CliError;

    fn args(kind: &str) -> XpathArgs {
        XpathArgs {
            kind: kind.to_string(),
            ..XpathArgs::default()
        }
    }

    #[test]
    fn test_button_by_normalized_label() {
        let xpath = execute_xpath(&XpathArgs {
            normalize_space: Some("Create Workspace".to_string()),
            ..args("button")
        })
        .unwrap();
        assert_eq!(
            xpath,
            r#"//*[(self::button or @role="button") and (normalize-space()="Create Workspace")]"#
        );
    }

    #[test]
    fn test_scoped_icon() {
        let xpath = execute_xpath(&XpathArgs {
            icon_shape: Some("times".to_string()),
            scope: Some(r#"//*[@role="dialog"]"#.to_string()),
            ..args("icon")
        })
        .unwrap();
        assert_eq!(xpath, r#"//*[@role="dialog"]//clr-icon[@shape="times"]"#);
    }

    #[test]
    fn test_nth_checkbox() {
        let xpath = execute_xpath(&XpathArgs {
            index: Some(3),
            ..args("checkbox")
        })
        .unwrap();
        assert_eq!(xpath, r#"(//input[@type="checkbox"])[3]"#);
    }

    #[test]
    fn test_two_text_matches_conflict() {
        let err = execute_xpath(&XpathArgs {
            name: Some("Save".to_string()),
            contains: Some("Sav".to_string()),
            ..args("button")
        })
        .unwrap_err();
        assert!(matches!(err, CliError::InvalidArgument { .. }));
    }

    #[test]
    fn test_missing_label() {
        assert!(execute_xpath(&args("textarea")).is_err());
    }

    #[test]
    fn test_ancestor_level_out_of_range() {
        let err = execute_xpath(&XpathArgs {
            name: Some("Description".to_string()),
            ancestor_level: Some(9),
            ..args("textarea")
        })
        .unwrap_err();
        assert!(err.to_string().contains("ancestor level 9"));
    }
}
