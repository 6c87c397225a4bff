//! Config command handler

use crate::commands::ConfigArgs;
use crate::config::CliConfig;
use crate::error::CliResult;
use pagekit::FrameworkConfig;

/// Render the effective (or default) framework configuration as YAML
pub fn execute_config(config: &CliConfig, args: &ConfigArgs) -> CliResult<String> {
    let yaml = if args.defaults {
        FrameworkConfig::default().to_yaml()?
    } else {
        config.framework.to_yaml()?
    };
    Ok(yaml)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
mod tests {
    use super::*;

    #[test]
    fn test_effective_config_round_trips() {
        let mut framework = FrameworkConfig::default();
        framework.data_table.page_size = 50;
        let config = CliConfig::new().with_framework(framework.clone());

        let yaml = execute_config(&config, &ConfigArgs::default()).unwrap();
        assert!(yaml.contains("page_size: 50"));
        assert_eq!(FrameworkConfig::from_yaml_str(&yaml).unwrap(), framework);
    }

    #[test]
    fn test_defaults_ignore_loaded_values() {
        let mut framework = FrameworkConfig::default();
        framework.data_table.page_size = 50;
        let config = CliConfig::new().with_framework(framework);

        let yaml = execute_config(&config, &ConfigArgs { defaults: true }).unwrap();
        assert!(yaml.contains("page_size: 20"));
    }
}
