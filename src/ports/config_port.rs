//! Configuration access port trait.

/// Sectioned key/value configuration, INI style.
///
/// Typed getters fall back to `default` when the key is missing or does not
/// parse; `get_string` is the only one that tells the two apart.
pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> i64;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> bool;
}
