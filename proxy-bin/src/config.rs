use rama::telemetry::tracing;

use fault_injection_proxy_lib::config::FaultConfig;

/// Fault properties which can be overwritten from the command line,
/// taking precedence over the (optional) config file.
#[derive(Debug, Clone, Default, clap::Args)]
pub struct FaultArgs {
    /// enable or disable the delay fault
    #[arg(long = "delay", value_name = "BOOL")]
    pub delay: Option<bool>,

    /// default delay duration in milliseconds
    #[arg(long = "delay-duration", value_name = "MS", allow_hyphen_values = true)]
    pub delay_duration: Option<i64>,

    /// default probability (in percent) of the delay fault
    #[arg(
        long = "delay-percentage",
        value_name = "PERCENT",
        allow_hyphen_values = true
    )]
    pub delay_percentage: Option<i64>,

    /// enable or disable the abort fault
    #[arg(long = "abort", value_name = "BOOL")]
    pub abort: Option<bool>,

    /// default status code of aborted requests
    #[arg(long = "abort-code", value_name = "CODE", allow_hyphen_values = true)]
    pub abort_code: Option<i64>,

    /// default probability (in percent) of the abort fault
    #[arg(
        long = "abort-percentage",
        value_name = "PERCENT",
        allow_hyphen_values = true
    )]
    pub abort_percentage: Option<i64>,

    /// name of the fault injection instance
    #[arg(long = "name", value_name = "NAME")]
    pub name: Option<String>,
}

/// Merge the fault config, where a property is taken from the cli
/// overwrite if defined, the config file otherwise and
/// finally falls back to the default value.
pub fn merge_fault_config(file_cfg: Option<FaultConfig>, overwrite_cfg: FaultArgs) -> FaultConfig {
    let (base_cfg, base_origin) = match file_cfg {
        Some(cfg) => (cfg, "config file"),
        None => (FaultConfig::default(), "default"),
    };

    macro_rules! merge_config {
        ($base:ident, $origin:ident, $overwrite:ident, {$($property:ident),+ $(,)?}) => {
            FaultConfig {
                $(
                    $property: if let Some(value) = $overwrite.$property {
                        tracing::info!("property '{}': use overwrite: {value:?}", stringify!($property));
                        value
                    } else {
                        tracing::info!("property '{}': use {}: {:?}", stringify!($property), $origin, $base.$property);
                        $base.$property
                    },
                )+
            }
        };
    }

    merge_config!(
        base_cfg, base_origin, overwrite_cfg,
        {
            delay,
            delay_duration,
            delay_percentage,
            abort,
            abort_code,
            abort_percentage,
            name,
        }
    )
}
