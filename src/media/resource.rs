//! Media resource descriptors

use serde::Serialize;

/// Where a media resource lives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResourceKind {
    /// Path on the local filesystem
    LocalFile,
    /// HTTP(S) URL
    RemoteStream,
}

/// Descriptor of the content offered to newly negotiating sessions
///
/// Construction never validates reachability; that happens when the
/// track provider opens it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MediaResource {
    identifier: String,
    kind: ResourceKind,
}

impl MediaResource {
    /// Create a resource descriptor
    pub fn new(identifier: impl Into<String>, kind: ResourceKind) -> Self {
        Self {
            identifier: identifier.into(),
            kind,
        }
    }

    /// A file on local disk
    pub fn local_file(path: impl Into<String>) -> Self {
        Self::new(path, ResourceKind::LocalFile)
    }

    /// A remote HTTP(S) resource
    pub fn remote_stream(url: impl Into<String>) -> Self {
        Self::new(url, ResourceKind::RemoteStream)
    }

    /// Infer the kind from the identifier's scheme
    pub fn parse(identifier: impl Into<String>) -> Self {
        let identifier = identifier.into();
        let lower = identifier.to_ascii_lowercase();
        if lower.starts_with("http://") || lower.starts_with("https://") {
            Self::remote_stream(identifier)
        } else {
            Self::local_file(identifier)
        }
    }

    /// Path or URL
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Resource kind
    pub fn kind(&self) -> ResourceKind {
        self.kind
    }

    /// Last path segment, ignoring any URL query or fragment
    pub fn file_name(&self) -> Option<&str> {
        let path = match self.kind {
            ResourceKind::LocalFile => self.identifier.as_str(),
            ResourceKind::RemoteStream => self
                .identifier
                .split(['?', '#'])
                .next()
                .unwrap_or_default(),
        };

        path.rsplit(['/', '\\'])
            .next()
            .filter(|name| !name.is_empty() && !name.contains(':'))
    }
}

impl std::fmt::Display for MediaResource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.identifier)
    }
}
