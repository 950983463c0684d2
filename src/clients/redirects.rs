//! Redirect URIs and the sector identifier.

use oidc_consts::REDIRECT_URI_INSTALLED_APP;
use url::{ParseError, Url};

use crate::config::ClientConfig;
use crate::validator::{ConfigIssue, Validator, check_list, join_quoted};

/// Check every redirect URI. Relative URIs are only accepted from public
/// clients; the installed-app literal likewise.
pub fn validate_redirect_uris(config: &ClientConfig, validator: &mut Validator) -> Vec<String> {
    let client = config.id.as_str();

    for uri in &config.redirect_uris {
        if uri == REDIRECT_URI_INSTALLED_APP {
            if !config.public {
                validator.push(ConfigIssue::ClientRedirectUriPublicOnly {
                    client: client.to_string(),
                    uri: uri.clone(),
                });
            }
            continue;
        }

        match Url::parse(uri) {
            Ok(_) => {}
            Err(ParseError::RelativeUrlWithoutBase) if config.public => {}
            Err(ParseError::RelativeUrlWithoutBase) => {
                validator.push(ConfigIssue::ClientRedirectUriNotAbsolute {
                    client: client.to_string(),
                    uri: uri.clone(),
                });
            }
            Err(e) => {
                validator.push(ConfigIssue::ClientRedirectUriUnparseable {
                    client: client.to_string(),
                    uri: uri.clone(),
                    reason: e.to_string(),
                });
            }
        }
    }

    let (_, duplicates) = check_list(&config.redirect_uris, None);
    if !duplicates.is_empty() {
        validator.push_warning(ConfigIssue::ClientDuplicateEntries {
            client: client.to_string(),
            attr: "redirect_uris",
            duplicates: join_quoted(&duplicates),
        });
    }

    config.redirect_uris.clone()
}

/// Check the sector identifier: `host` or `host:port`. A value written as
/// a URL is rejected with one error per component that must not be there.
pub fn validate_sector_identifier(
    config: &ClientConfig,
    validator: &mut Validator,
) -> Option<String> {
    let value = config.sector_identifier.as_deref().filter(|v| !v.is_empty())?;
    let client = config.id.as_str();

    if value.contains("://") {
        match Url::parse(value) {
            Ok(url) => report_url_components(client, value, &url, validator),
            Err(_) => validator.push(ConfigIssue::ClientSectorIdentifierHost {
                client: client.to_string(),
                value: value.to_string(),
            }),
        }
    } else if !is_host_with_optional_port(value) {
        validator.push(ConfigIssue::ClientSectorIdentifierHost {
            client: client.to_string(),
            value: value.to_string(),
        });
    }

    Some(value.to_string())
}

fn report_url_components(client: &str, value: &str, url: &Url, validator: &mut Validator) {
    let host = match (url.host_str(), url.port()) {
        (Some(host), Some(port)) => format!("{host}:{port}"),
        (Some(host), None) => host.to_string(),
        (None, _) => String::new(),
    };

    let mut component = |component: &'static str, found: Option<&str>| {
        validator.push(ConfigIssue::ClientSectorIdentifierComponent {
            client: client.to_string(),
            value: value.to_string(),
            host: host.clone(),
            component,
            detail: found
                .map(|v| format!(" with the value '{v}'"))
                .unwrap_or_default(),
        });
    };

    component("scheme", Some(url.scheme()));

    let path = url.path();
    if !path.is_empty() && path != "/" {
        component("path", Some(path));
    }
    if let Some(query) = url.query().filter(|q| !q.is_empty()) {
        component("query", Some(query));
    }
    if let Some(fragment) = url.fragment().filter(|f| !f.is_empty()) {
        component("fragment", Some(fragment));
    }
    if !url.username().is_empty() {
        component("username", Some(url.username()));
    }
    if url.password().is_some() {
        component("password", None);
    }
}

fn is_host_with_optional_port(value: &str) -> bool {
    if value.contains(['/', '?', '#', '@']) {
        return false;
    }

    let (host, port) = if value.starts_with('[') {
        // Bracketed IPv6 literal, the brackets stay for `Host::parse`
        match value.find(']') {
            Some(end) => match &value[end + 1..] {
                "" => (&value[..=end], None),
                rest => match rest.strip_prefix(':') {
                    Some(port) => (&value[..=end], Some(port)),
                    None => return false,
                },
            },
            None => return false,
        }
    } else {
        match value.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => (host, Some(port)),
            _ => (value, None),
        }
    };

    if port.is_some_and(|p| p.parse::<u16>().is_err()) {
        return false;
    }
    !host.is_empty() && url::Host::parse(host).is_ok()
}
