//! Process-wide render settings.
//!
//! Settings control the heuristic that decides whether a cache should back
//! its attribute arrays with device buffer objects for a given vertex count.
//! They are usually created once at startup (optionally from the
//! environment) and shared across caches via `Arc`.

/// Environment variable overriding [`RenderSettings::min_vertex_count_for_vbo`].
pub const ENV_MIN_VBO_VERTICES: &str = "PRIMCACHE_MIN_VBO_VERTICES";
/// Environment variable overriding [`RenderSettings::max_vertex_count_for_vbo`].
pub const ENV_MAX_VBO_VERTICES: &str = "PRIMCACHE_MAX_VBO_VERTICES";
/// Environment variable overriding [`RenderSettings::force_vertex_arrays`].
pub const ENV_FORCE_VERTEX_ARRAYS: &str = "PRIMCACHE_FORCE_VERTEX_ARRAYS";
/// Environment variable overriding [`RenderSettings::force_vbo`].
pub const ENV_FORCE_VBO: &str = "PRIMCACHE_FORCE_VBO";

/// Tunables for the buffer-object rendering heuristic.
///
/// Buffer objects pay off for geometry that is drawn many times, but the
/// setup cost is wasted on tiny meshes and the memory cost can be
/// prohibitive for enormous ones. The defaults bracket the common case.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderSettings {
    /// Minimum unique-vertex count before a buffer object is created.
    pub min_vertex_count_for_vbo: usize,
    /// Maximum unique-vertex count for which a buffer object is created.
    pub max_vertex_count_for_vbo: usize,
    /// Never create buffer objects; always prefer the vertex-array path.
    pub force_vertex_arrays: bool,
    /// Create buffer objects regardless of the vertex-count window.
    pub force_vbo: bool,
}

impl Default for RenderSettings {
    fn default() -> Self {
        Self {
            min_vertex_count_for_vbo: 20,
            max_vertex_count_for_vbo: 256 * 1024 * 1024,
            force_vertex_arrays: false,
            force_vbo: false,
        }
    }
}

impl RenderSettings {
    /// Create settings with the built-in defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create settings from the defaults, then apply any `PRIMCACHE_*`
    /// environment overrides.
    ///
    /// Malformed values are logged and ignored.
    pub fn from_env() -> Self {
        let mut settings = Self::default();
        if let Some(value) = read_env_usize(ENV_MIN_VBO_VERTICES) {
            settings.min_vertex_count_for_vbo = value;
        }
        if let Some(value) = read_env_usize(ENV_MAX_VBO_VERTICES) {
            settings.max_vertex_count_for_vbo = value;
        }
        if let Some(value) = read_env_bool(ENV_FORCE_VERTEX_ARRAYS) {
            settings.force_vertex_arrays = value;
        }
        if let Some(value) = read_env_bool(ENV_FORCE_VBO) {
            settings.force_vbo = value;
        }
        settings
    }

    /// Decide whether a buffer object should be created for a cache holding
    /// `vertex_count` unique vertices.
    ///
    /// `force_vertex_arrays` wins over everything, including `force_vbo`.
    pub fn should_create_vbo(&self, vertex_count: usize) -> bool {
        if self.force_vertex_arrays {
            return false;
        }
        if self.force_vbo {
            return true;
        }
        vertex_count >= self.min_vertex_count_for_vbo
            && vertex_count <= self.max_vertex_count_for_vbo
    }
}

fn read_env_usize(name: &str) -> Option<usize> {
    let raw = std::env::var(name).ok()?;
    match raw.parse() {
        Ok(value) => Some(value),
        Err(_) => {
            log::warn!("{name}: cannot parse {raw:?} as an integer, ignoring");
            None
        }
    }
}

fn read_env_bool(name: &str) -> Option<bool> {
    let raw = std::env::var(name).ok()?;
    match raw.as_str() {
        "1" | "true" | "yes" => Some(true),
        "0" | "false" | "no" => Some(false),
        _ => {
            log::warn!("{name}: cannot parse {raw:?} as a boolean, ignoring");
            None
        }
    }
}
