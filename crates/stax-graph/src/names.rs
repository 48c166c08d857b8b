use crate::path::ModulePath;

const SALT_LEN: usize = 6;

/// Hands out collision-free output names for assets within one build.
///
/// A name is `<stem>-<salt><counter>.<ext>`. The salt is fixed for the
/// allocator's lifetime and the counter only grows, so two allocations from
/// the same allocator can never produce the same name, whatever the stems.
/// Seeding the salt makes the whole sequence reproducible.
#[derive(Debug, Clone)]
pub struct NameAllocator {
    salt: String,
    counter: u64,
}

impl NameAllocator {
    /// Allocator with a random salt.
    pub fn random() -> Self {
        let salt: String = uuid::Uuid::new_v4()
            .simple()
            .to_string()
            .chars()
            .take(SALT_LEN)
            .collect();
        Self::seeded(salt)
    }

    /// Allocator with a caller-chosen salt.
    ///
    /// Characters outside `[a-z0-9]` are dropped so the salt is always safe
    /// inside a file name.
    pub fn seeded(salt: impl AsRef<str>) -> Self {
        let salt = salt
            .as_ref()
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self { salt, counter: 0 }
    }

    pub fn salt(&self) -> &str {
        &self.salt
    }

    /// Next unique name for the asset at `path`.
    pub fn asset_name(&mut self, path: &ModulePath) -> String {
        let suffix = self.next_suffix();
        match path.extension() {
            Some(ext) => format!("{}-{}.{}", path.file_stem(), suffix, ext),
            None => format!("{}-{}", path.file_stem(), suffix),
        }
    }

    fn next_suffix(&mut self) -> String {
        let suffix = format!("{}{}", self.salt, self.counter);
        self.counter += 1;
        suffix
    }
}

impl Default for NameAllocator {
    fn default() -> Self {
        Self::random()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_same_stem_different_dirs_never_collide() {
        let mut names = NameAllocator::seeded("abc123");
        let first = names.asset_name(&ModulePath::new("a/logo.png"));
        let second = names.asset_name(&ModulePath::new("b/logo.png"));

        assert_eq!(first, "logo-abc1230.png");
        assert_eq!(second, "logo-abc1231.png");
    }

    #[test]
    fn test_seeded_is_reproducible() {
        let path = ModulePath::new("img/photo.jpg");
        let a: Vec<_> = {
            let mut names = NameAllocator::seeded("s");
            (0..3).map(|_| names.asset_name(&path)).collect()
        };
        let b: Vec<_> = {
            let mut names = NameAllocator::seeded("s");
            (0..3).map(|_| names.asset_name(&path)).collect()
        };
        assert_eq!(a, b);
    }

    #[test]
    fn test_salt_is_sanitized() {
        let names = NameAllocator::seeded("A/b-C");
        assert_eq!(names.salt(), "abc");
    }

    #[test]
    fn test_random_salt_shape() {
        let names = NameAllocator::random();
        assert_eq!(names.salt().len(), SALT_LEN);
        assert!(names.salt().chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn test_extensionless_asset() {
        let mut names = NameAllocator::seeded("x");
        assert_eq!(names.asset_name(&ModulePath::new("LICENSE")), "LICENSE-x0");
    }
}
