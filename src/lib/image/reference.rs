use std::fmt;

pub const DEFAULT_REGISTRY: &str = "docker.io";
pub const DEFAULT_TAG: &str = "latest";
const OFFICIAL_PREFIX: &str = "library/";

/// A `registry/name:tag` triple. Parsing never fails: malformed input still
/// decomposes into some triple and validation is left to the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageReference {
    pub registry: String,
    pub name: String,
    pub tag: String,
}

impl ImageReference {
    pub fn parse(image_ref: &str) -> Self {
        let mut registry = DEFAULT_REGISTRY.to_string();
        let mut rest = image_ref;

        // The first segment is a registry host only if it looks like one.
        if let Some((first, remainder)) = image_ref.split_once('/') {
            if first.contains('.') || first.contains(':') {
                registry = first.to_string();
                rest = remainder;
            }
        }

        let (name, tag) = match rest.rsplit_once(':') {
            Some((name, tag)) => (name.to_string(), tag.to_string()),
            None => (rest.to_string(), DEFAULT_TAG.to_string()),
        };

        let name = if registry == DEFAULT_REGISTRY && !name.contains('/') {
            format!("{}{}", OFFICIAL_PREFIX, name)
        } else {
            name
        };

        ImageReference {
            registry,
            name,
            tag,
        }
    }

    pub fn is_docker_hub(&self) -> bool {
        self.registry == DEFAULT_REGISTRY
    }

    /// Reference handed to the container engine. Docker Hub images are
    /// left unqualified, matching what `docker pull` stores locally.
    pub fn engine_reference(&self) -> String {
        if self.is_docker_hub() {
            format!("{}:{}", self.name, self.tag)
        } else {
            self.to_string()
        }
    }

    /// `docker://` transport locator for the copy tool, always qualified.
    pub fn copy_locator(&self) -> String {
        format!("docker://{}", self)
    }

    pub fn short_name(&self) -> &str {
        self.name.strip_prefix(OFFICIAL_PREFIX).unwrap_or(&self.name)
    }
}

impl fmt::Display for ImageReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}:{}", self.registry, self.name, self.tag)
    }
}

/// Host part of an already-qualified target image (`host/project/name:tag`).
pub fn registry_host(image: &str) -> &str {
    image.split('/').next().unwrap_or(image)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn triple(image_ref: &str) -> (String, String, String) {
        let parsed = ImageReference::parse(image_ref);
        (parsed.registry, parsed.name, parsed.tag)
    }

    #[test]
    fn parses_official_image_with_defaults() {
        assert_eq!(
            triple("nginx"),
            ("docker.io".into(), "library/nginx".into(), "latest".into())
        );
    }

    #[test]
    fn parses_official_image_with_tag() {
        assert_eq!(
            triple("nginx:1.25"),
            ("docker.io".into(), "library/nginx".into(), "1.25".into())
        );
    }

    #[test]
    fn parses_explicit_registry() {
        assert_eq!(
            triple("myregistry.io/app:v2"),
            ("myregistry.io".into(), "app".into(), "v2".into())
        );
    }

    #[test]
    fn user_namespace_is_not_a_registry() {
        assert_eq!(
            triple("user/app"),
            ("docker.io".into(), "user/app".into(), "latest".into())
        );
    }

    #[test]
    fn registry_with_port_splits_tag_on_last_colon() {
        assert_eq!(
            triple("localhost:5000/team/app:1.0"),
            ("localhost:5000".into(), "team/app".into(), "1.0".into())
        );
    }

    #[test]
    fn explicit_docker_io_still_gets_library_prefix() {
        assert_eq!(
            triple("docker.io/redis:7"),
            ("docker.io".into(), "library/redis".into(), "7".into())
        );
    }

    #[test]
    fn renders_engine_and_copy_forms() {
        let hub = ImageReference::parse("nginx:1.25");
        assert_eq!(hub.engine_reference(), "library/nginx:1.25");
        assert_eq!(hub.copy_locator(), "docker://docker.io/library/nginx:1.25");
        assert_eq!(hub.short_name(), "nginx");

        let private = ImageReference::parse("quay.io/org/tool:v1");
        assert_eq!(private.engine_reference(), "quay.io/org/tool:v1");
        assert_eq!(private.copy_locator(), "docker://quay.io/org/tool:v1");
        assert_eq!(private.short_name(), "org/tool");
    }

    #[test]
    fn registry_host_takes_first_segment() {
        let host = registry_host("harbor.local/library/nginx:1.25");
        assert_eq!(host, "harbor.local");
        assert_eq!(registry_host("bare"), "bare");
    }
}
