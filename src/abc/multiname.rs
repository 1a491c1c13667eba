use std::borrow::Cow;
use std::fmt::{self, Display};
use std::sync::Arc;

pub const ANY_NAME: &str = "*";
pub const PRIVATE_NS: &str = "private";
pub const VECTOR_NS: &str = "__AS3__.vec";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NamespaceKind {
    /// Pool index 0.
    Any,
    Namespace,
    Package,
    PackageInternal,
    Protected,
    Explicit,
    StaticProtected,
    Private,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Namespace {
    pub(crate) kind: NamespaceKind,
    pub(crate) name: Arc<str>,
}

impl Namespace {
    pub fn new(kind: NamespaceKind, name: impl Into<Arc<str>>) -> Self {
        Self {
            kind,
            name: name.into(),
        }
    }

    pub fn public() -> Self {
        Self::new(NamespaceKind::Package, "")
    }

    pub fn private() -> Self {
        Self::new(NamespaceKind::Private, PRIVATE_NS)
    }

    pub fn kind(&self) -> NamespaceKind {
        self.kind
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }

    /// Source keyword or identifier a declaration in this namespace is written with.
    pub fn identifier(&self) -> Cow<'_, str> {
        match self.kind {
            NamespaceKind::Private => Cow::Borrowed("private"),
            NamespaceKind::Protected | NamespaceKind::StaticProtected => Cow::Borrowed("protected"),
            NamespaceKind::PackageInternal => Cow::Borrowed("internal"),
            NamespaceKind::Any | NamespaceKind::Package => Cow::Borrowed("public"),
            NamespaceKind::Namespace | NamespaceKind::Explicit if self.name.is_empty() => {
                Cow::Borrowed("public")
            }
            NamespaceKind::Namespace | NamespaceKind::Explicit => uri_identifier(&self.name),
        }
    }
}

impl Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn uri_identifier(uri: &str) -> Cow<'_, str> {
    match uri {
        "http://adobe.com/AS3/2006/builtin" => return Cow::Borrowed("AS3"),
        "http://www.adobe.com/2006/flex/mx/internal" => return Cow::Borrowed("mx_internal"),
        "http://www.adobe.com/2006/actionscript/flash/proxy" => {
            return Cow::Borrowed("flash_proxy");
        }
        "http://www.adobe.com/2006/actionscript/flash/objectproxy" => {
            return Cow::Borrowed("object_proxy");
        }
        _ => {}
    }
    let segment = uri
        .rsplit(['/', ':', '#'])
        .find(|segment| !segment.is_empty())
        .unwrap_or(uri);
    if is_identifier(segment) {
        return Cow::Borrowed(segment);
    }
    let mut identifier: String = segment
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '_' || c == '$' { c } else { '_' })
        .collect();
    if identifier.chars().next().is_none_or(|c| c.is_ascii_digit()) {
        identifier.insert(0, '_');
    }
    Cow::Owned(identifier)
}

/// Bare-identifier check used for parameter names.
pub fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    (first.is_alphabetic() || first == '_' || first == '$')
        && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
}

/// A local name with its ordered candidate namespaces.
///
/// No candidates means the name is unqualified. The local name is absent for
/// runtime-supplied names.
#[derive(Debug, Clone, PartialEq)]
pub struct Multiname {
    pub(crate) namespaces: Arc<[Namespace]>,
    pub(crate) name: Option<Arc<str>>,
}

impl Multiname {
    pub fn new(namespaces: impl Into<Arc<[Namespace]>>, name: Option<Arc<str>>) -> Self {
        Self {
            namespaces: namespaces.into(),
            name,
        }
    }

    pub fn bare(name: impl Into<Arc<str>>) -> Self {
        Self::new(Vec::<Namespace>::new(), Some(name.into()))
    }

    pub fn qualified(namespace: Namespace, name: impl Into<Arc<str>>) -> Self {
        Self::new(vec![namespace], Some(name.into()))
    }

    /// The name every pool index 0 stands for.
    pub fn any() -> Self {
        Self::qualified(Namespace::public(), ANY_NAME)
    }

    pub fn namespaces(&self) -> &[Namespace] {
        &self.namespaces
    }

    pub fn namespace(&self) -> Option<&Namespace> {
        self.namespaces.first()
    }

    pub fn local_name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    pub fn name(&self) -> &str {
        self.name.as_deref().unwrap_or(ANY_NAME)
    }

    pub fn has_not_empty_ns(&self) -> bool {
        self.namespace().is_some_and(|ns| !ns.is_empty())
    }

    pub fn is_private(&self) -> bool {
        self.namespace()
            .is_some_and(|ns| ns.kind == NamespaceKind::Private)
    }

    pub fn is_vector(&self) -> bool {
        self.namespace().is_some_and(|ns| &*ns.name == VECTOR_NS)
    }

    /// `ns.name`, the form used in import statements and type annotations.
    pub fn dotted(&self) -> String {
        match self.namespace() {
            Some(ns) if !ns.is_empty() => format!("{}.{}", ns.name, self.name()),
            _ => self.name().to_string(),
        }
    }

    /// Drops the namespace when it is the package the reference appears in.
    pub fn display_in(&self, package: &str) -> String {
        match self.namespace() {
            Some(ns) if !ns.is_empty() && &*ns.name != package && !self.is_private() => {
                self.dotted()
            }
            _ => self.name().to_string(),
        }
    }

    /// Rendering of this name as a generic type argument.
    pub(crate) fn type_argument(&self) -> String {
        let text = if self.is_vector() || self.is_private() {
            self.name().to_string()
        } else {
            self.to_string()
        };
        text.replace("::", ".")
    }

    pub(crate) fn with_suffix(&self, suffix: &str) -> Self {
        Self {
            namespaces: Arc::clone(&self.namespaces),
            name: Some(Arc::from(format!("{}{suffix}", self.name()))),
        }
    }
}

impl Display for Multiname {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(ns) = self.namespace().filter(|ns| !ns.is_empty()) {
            write!(f, "{}::", ns.name)?;
        }
        f.write_str(self.name())
    }
}
