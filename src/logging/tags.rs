//! Catalog of known feature and module tags.
//!
//! Tags on log entries are free-form strings; this catalog only seeds the
//! default policy and the sample configuration.

/// Feature tags name a user-facing capability
pub mod feature {
    pub const AUTH: &str = "AUTH";
    pub const PROJECT_MANAGEMENT: &str = "PROJECT_MANAGEMENT";
    pub const USER_MANAGEMENT: &str = "USER_MANAGEMENT";
    pub const SECURITY: &str = "SECURITY";
    pub const ERROR_HANDLING: &str = "ERROR_HANDLING";

    pub const BROWSER_AUTOMATION: &str = "BROWSER_AUTOMATION";
    pub const ELEMENT_INTERACTION: &str = "ELEMENT_INTERACTION";
    pub const SCREENSHOT_CAPTURE: &str = "SCREENSHOT_CAPTURE";
    pub const NETWORK_MONITORING: &str = "NETWORK_MONITORING";
    pub const PAGE_ANALYSIS: &str = "PAGE_ANALYSIS";

    pub const VISION_PROCESSING: &str = "VISION_PROCESSING";
    pub const IMAGE_COMPRESSION: &str = "IMAGE_COMPRESSION";
    pub const ELEMENT_DETECTION: &str = "ELEMENT_DETECTION";

    pub const FILE_OPERATIONS: &str = "FILE_OPERATIONS";
    pub const CONFIGURATION: &str = "CONFIGURATION";
    pub const MONITORING: &str = "MONITORING";

    pub const DEBUG: &str = "DEBUG";
    pub const TESTING: &str = "TESTING";
    pub const PERFORMANCE: &str = "PERFORMANCE";

    pub const SYSTEM_INTEGRATION: &str = "SYSTEM_INTEGRATION";
    pub const HARDWARE_DETECTION: &str = "HARDWARE_DETECTION";
    pub const LOGGING: &str = "LOGGING";
}

/// Module tags name an internal code area
pub mod module {
    pub const SERVICES: &str = "SERVICES";
    pub const CONTROLLERS: &str = "CONTROLLERS";
    pub const HANDLERS: &str = "HANDLERS";
    pub const UTILS: &str = "UTILS";

    pub const BROWSER_MANAGER: &str = "BROWSER_MANAGER";
    pub const ELEMENT_PROCESSORS: &str = "ELEMENT_PROCESSORS";
    pub const NETWORK_ANALYZERS: &str = "NETWORK_ANALYZERS";
    pub const VISION_PROCESSORS: &str = "VISION_PROCESSORS";

    pub const STORAGE: &str = "STORAGE";
    pub const FORMATTERS: &str = "FORMATTERS";
    pub const VALIDATORS: &str = "VALIDATORS";
    pub const ANALYZERS: &str = "ANALYZERS";

    pub const MIDDLEWARE: &str = "MIDDLEWARE";
    pub const REPOSITORIES: &str = "REPOSITORIES";
    pub const MODELS: &str = "MODELS";
    pub const COMPONENTS: &str = "COMPONENTS";

    pub const TESTS: &str = "TESTS";
    pub const TOOLS: &str = "TOOLS";
    pub const SCRIPTS: &str = "SCRIPTS";
    pub const CONFIGS: &str = "CONFIGS";
}

pub const FEATURE_TAGS: &[&str] = &[
    feature::AUTH,
    feature::PROJECT_MANAGEMENT,
    feature::USER_MANAGEMENT,
    feature::SECURITY,
    feature::ERROR_HANDLING,
    feature::BROWSER_AUTOMATION,
    feature::ELEMENT_INTERACTION,
    feature::SCREENSHOT_CAPTURE,
    feature::NETWORK_MONITORING,
    feature::PAGE_ANALYSIS,
    feature::VISION_PROCESSING,
    feature::IMAGE_COMPRESSION,
    feature::ELEMENT_DETECTION,
    feature::FILE_OPERATIONS,
    feature::CONFIGURATION,
    feature::MONITORING,
    feature::DEBUG,
    feature::TESTING,
    feature::PERFORMANCE,
    feature::SYSTEM_INTEGRATION,
    feature::HARDWARE_DETECTION,
    feature::LOGGING,
];

pub const MODULE_TAGS: &[&str] = &[
    module::SERVICES,
    module::CONTROLLERS,
    module::HANDLERS,
    module::UTILS,
    module::BROWSER_MANAGER,
    module::ELEMENT_PROCESSORS,
    module::NETWORK_ANALYZERS,
    module::VISION_PROCESSORS,
    module::STORAGE,
    module::FORMATTERS,
    module::VALIDATORS,
    module::ANALYZERS,
    module::MIDDLEWARE,
    module::REPOSITORIES,
    module::MODELS,
    module::COMPONENTS,
    module::TESTS,
    module::TOOLS,
    module::SCRIPTS,
    module::CONFIGS,
];

/// Named (feature, module) pairs for common call sites
pub const COMMON_TAG_COMBINATIONS: &[(&str, (&str, &str))] = &[
    (
        "browser_automation",
        (feature::BROWSER_AUTOMATION, module::BROWSER_MANAGER),
    ),
    (
        "element_click",
        (feature::ELEMENT_INTERACTION, module::ELEMENT_PROCESSORS),
    ),
    (
        "screenshot",
        (feature::SCREENSHOT_CAPTURE, module::VISION_PROCESSORS),
    ),
    (
        "network_analysis",
        (feature::NETWORK_MONITORING, module::NETWORK_ANALYZERS),
    ),
    ("file_ops", (feature::FILE_OPERATIONS, module::UTILS)),
    ("error_handling", (feature::ERROR_HANDLING, module::HANDLERS)),
    ("system_config", (feature::CONFIGURATION, module::CONFIGS)),
    ("debug_tools", (feature::DEBUG, module::TOOLS)),
];

pub fn is_known_feature(tag: &str) -> bool {
    FEATURE_TAGS.contains(&tag)
}

pub fn is_known_module(tag: &str) -> bool {
    MODULE_TAGS.contains(&tag)
}

/// Look up a named tag combination
pub fn combination(name: &str) -> Option<(&'static str, &'static str)> {
    COMMON_TAG_COMBINATIONS
        .iter()
        .find(|(key, _)| *key == name)
        .map(|(_, pair)| *pair)
}
