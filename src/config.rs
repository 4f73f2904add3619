use once_cell::sync::Lazy;

// --- Distance encoding ---
/// Saturation constant: `i32::MAX - 2` encodes "true with full confidence".
pub const K: i32 = i32::MAX - 2;
pub const TRUE: i32 = K;
pub const FALSE: i32 = -K;
// Default approximation magnitude used by `normalize`
pub const DEFAULT_MAX_INT: i32 = 2048;

// --- Rewriting ---
pub const DEFAULT_HELPER_CLASS: &str = "testability/runtime/Distance";
// Suffix appended to a method whose rewritten descriptor collides
pub const RENAME_SUFFIX: &str = "_transformed";
// Worst-case extra operand stack used by the inserted helper sequences
pub const PIPELINE_STACK_SLACK: u16 = 4;
// Packages that never count as inside the rewrite scope
pub const LIBRARY_PREFIXES: [&str; 4] = ["java/", "javax/", "jdk/", "sun/"];

// --- Environment ---
pub static SCOPE_VAR: &str = "TESTABILITY_SCOPE";
pub static TARGET_VAR: &str = "TESTABILITY_TARGET";
pub static PREFIX_VAR: &str = "TESTABILITY_PREFIX";
pub static MAX_INT_VAR: &str = "TESTABILITY_MAX_INT";
pub static HELPER_CLASS_VAR: &str = "TESTABILITY_HELPER_CLASS";

/// Process-wide defaults, read once from the environment.
pub static GLOBAL_CONFIG: Lazy<TransformConfig> = Lazy::new(TransformConfig::from_env);

/// Which classes are eligible for signature and body rewriting.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum Scope {
    /// Everything except the Java platform packages.
    #[default]
    All,
    /// One class (internal name) and its nested classes.
    Target(String),
    /// Every class whose internal name starts with the prefix.
    Prefix(String),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransformConfig {
    pub scope: Scope,
    /// Approximation magnitude bounding `normalize`.
    pub max_int: i32,
    /// Internal name of the class holding the runtime distance helpers.
    pub helper_class: String,
}

impl Default for TransformConfig {
    fn default() -> Self {
        TransformConfig {
            scope: Scope::All,
            max_int: DEFAULT_MAX_INT,
            helper_class: DEFAULT_HELPER_CLASS.to_string(),
        }
    }
}

impl TransformConfig {
    pub fn with_scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_max_int(mut self, max_int: i32) -> Self {
        self.max_int = max_int.max(1);
        self
    }

    pub fn with_helper_class(mut self, helper_class: impl Into<String>) -> Self {
        self.helper_class = helper_class.into();
        self
    }

    /// Read the configuration from `TESTABILITY_*` variables, falling back to
    /// defaults for anything missing or unparsable.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`TransformConfig::from_env`] with an explicit variable source.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = TransformConfig::default();
        let target = lookup(TARGET_VAR).map(|t| to_internal_name(&t));
        let prefix = lookup(PREFIX_VAR).map(|p| to_internal_name(&p));
        match lookup(SCOPE_VAR).as_deref().map(str::to_ascii_lowercase).as_deref() {
            Some("target") => match target {
                Some(target) => config.scope = Scope::Target(target),
                None => log::warn!("{} is `target` but {} is unset, using `all`", SCOPE_VAR, TARGET_VAR),
            },
            Some("prefix") => match prefix {
                Some(prefix) => config.scope = Scope::Prefix(prefix),
                None => log::warn!("{} is `prefix` but {} is unset, using `all`", SCOPE_VAR, PREFIX_VAR),
            },
            Some("all") | None => {}
            Some(other) => log::warn!("unknown scope `{}`, using `all`", other),
        }
        if let Some(raw) = lookup(MAX_INT_VAR) {
            match raw.trim().parse::<i32>() {
                Ok(value) if value > 0 => config.max_int = value,
                _ => log::warn!("ignoring invalid {}=`{}`", MAX_INT_VAR, raw),
            }
        }
        if let Some(helper) = lookup(HELPER_CLASS_VAR) {
            config.helper_class = to_internal_name(&helper);
        }
        config
    }
}

/// `a.b.C` -> `a/b/C`; internal names pass through.
pub fn to_internal_name(name: &str) -> String {
    name.trim().replace('.', "/")
}
