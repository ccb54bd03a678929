use serde::Deserialize;

///
/// Localization
///
/// Configured locale codes. Localized fields store one value per code under
/// a locale-qualified key.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct Localization {
    pub locales: Vec<String>,
    pub default_locale: String,
}

impl Localization {
    pub fn new<I, S>(locales: I, default_locale: impl Into<String>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            locales: locales.into_iter().map(Into::into).collect(),
            default_locale: default_locale.into(),
        }
    }

    #[must_use]
    pub fn contains(&self, code: &str) -> bool {
        self.locales.iter().any(|locale| locale == code)
    }
}

///
/// LocaleContext
///
/// Request-scoped active locale.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct LocaleContext {
    pub active: Option<String>,
}

impl LocaleContext {
    pub fn new(active: impl Into<String>) -> Self {
        Self {
            active: Some(active.into()),
        }
    }

    /// Locale appended to localized storage paths that name no locale
    /// explicitly: the active locale, or `default` when none is set. `all`
    /// and `*` request every locale and qualify nothing.
    #[must_use]
    pub fn qualifying_locale<'a>(&'a self, default: &'a str) -> Option<&'a str> {
        match self.active.as_deref() {
            None => Some(default),
            Some("all" | "*") => None,
            Some(code) => Some(code),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_locales_do_not_qualify() {
        assert_eq!(LocaleContext::new("de").qualifying_locale("en"), Some("de"));
        assert_eq!(LocaleContext::new("all").qualifying_locale("en"), None);
        assert_eq!(LocaleContext::new("*").qualifying_locale("en"), None);
    }

    #[test]
    fn missing_locale_falls_back_to_the_default() {
        assert_eq!(LocaleContext::default().qualifying_locale("en"), Some("en"));
    }
}
