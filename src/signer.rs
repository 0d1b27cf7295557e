//! OAuth1 `Authorization` header generation.
//!
//! Nothing here touches the network or a property store: the header is a
//! function of the secrets, the protocol parameters and the request itself.
//! HMAC-SHA1 and nonce/timestamp generation come from `oauth1-request`.

use oauth1_request::signer::Signer as OAuthSigner;
use oauth1_request::{HmacSha1, Options};
use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};
use reqwest::Method;
use url::Url;

use crate::{Error, Result, SecretsProvider, OAUTH_KEY_PREFIX, REALM_KEY};

const UNRESERVED: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b'-')
    .remove(b'.')
    .remove(b'_')
    .remove(b'~');

/// Protocol parameters of a single signed request.
///
/// Nonce and timestamp are generated per request unless fixed here.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OAuthParameters {
    callback: Option<String>,
    nonce: Option<String>,
    realm: Option<String>,
    timestamp: Option<u64>,
    verifier: Option<String>,
    version: bool,
}

impl OAuthParameters {
    pub fn new() -> Self {
        Default::default()
    }

    /// set the oauth_callback value
    pub fn callback<T: Into<String>>(self, callback: T) -> Self {
        OAuthParameters {
            callback: Some(callback.into()),
            ..self
        }
    }

    /// set the oauth_nonce value
    pub fn nonce<T: Into<String>>(self, nonce: T) -> Self {
        OAuthParameters {
            nonce: Some(nonce.into()),
            ..self
        }
    }

    /// set the realm value
    pub fn realm<T: Into<String>>(self, realm: T) -> Self {
        OAuthParameters {
            realm: Some(realm.into()),
            ..self
        }
    }

    /// set the oauth_timestamp value
    pub fn timestamp<T: Into<u64>>(self, timestamp: T) -> Self {
        OAuthParameters {
            timestamp: Some(timestamp.into()),
            ..self
        }
    }

    /// set the oauth_verifier value
    pub fn verifier<T: Into<String>>(self, verifier: T) -> Self {
        OAuthParameters {
            verifier: Some(verifier.into()),
            ..self
        }
    }

    /// When `true`, `oauth_version="1.0"` is included. OAuth1 allows the
    /// parameter to be omitted.
    pub fn version(self, version: bool) -> Self {
        OAuthParameters { version, ..self }
    }

    fn options<'a>(&'a self, token: Option<&'a str>) -> Options<'a> {
        let mut opt = Options::new();

        // NOTE: items must be added by alphabetical order
        if let Some(ref callback) = self.callback {
            opt.callback(callback.as_str());
        }
        if let Some(ref nonce) = self.nonce {
            opt.nonce(nonce.as_str());
        }
        if let Some(timestamp) = self.timestamp {
            opt.timestamp(timestamp);
        }
        if let Some(token) = token {
            opt.token(token);
        }
        if let Some(ref verifier) = self.verifier {
            opt.verifier(verifier.as_str());
        }
        opt.version(self.version);

        opt
    }
}

#[derive(Debug, Clone)]
pub struct Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    secrets: &'a TSecretsProvider,
    parameters: OAuthParameters,
}

impl<'a, TSecretsProvider> Signer<'a, TSecretsProvider>
where
    TSecretsProvider: SecretsProvider,
{
    pub fn new(secrets: &'a TSecretsProvider, parameters: OAuthParameters) -> Self {
        Signer {
            secrets,
            parameters,
        }
    }

    /// Returns the `Authorization` header value for a request.
    ///
    /// Query parameters of `url` and the pairs of `form_body` (an
    /// `application/x-www-form-urlencoded` body) are part of the signature
    /// base string. Other body types are not.
    ///
    /// # Errors
    ///
    /// [`Error::Request`] when the query or form carries an `oauth_*`
    /// parameter; those are reserved for the header.
    pub fn authorization(
        &self,
        method: &Method,
        url: &Url,
        form_body: Option<&str>,
    ) -> Result<String> {
        let (consumer_key, consumer_secret) = self.secrets.consumer_pair();
        let (token, token_secret) = self.secrets.token_option_pair();
        let options = self.parameters.options(token);

        let mut base_url = url.clone();
        base_url.set_query(None);
        base_url.set_fragment(None);

        let body_pairs = form_body
            .map(|body| url::form_urlencoded::parse(body.as_bytes()).collect::<Vec<_>>())
            .unwrap_or_default();
        let mut parameters = Vec::new();
        for (key, value) in url.query_pairs().chain(body_pairs) {
            if key.starts_with(OAUTH_KEY_PREFIX) {
                return Err(Error::Request(format!(
                    "{} must not be sent as a query or form parameter",
                    key
                )));
            }
            parameters.push((encode(&key), encode(&value)));
        }
        // ordered by encoded name, then encoded value
        parameters.sort();

        // the oauth_* block is inserted where "oauth_" sorts
        let split = parameters.partition_point(|(key, _)| key.as_str() < OAUTH_KEY_PREFIX);
        let (before_oauth, after_oauth) = parameters.split_at(split);

        let mut signer = OAuthSigner::with_signature_method(
            HmacSha1,
            method.as_str(),
            base_url,
            consumer_secret,
            token_secret,
        );
        // the signer encodes values once more but feeds keys as given
        for (key, value) in before_oauth {
            signer.parameter_encoded(&encode(key), value);
        }
        let mut signer = signer.oauth_parameters(consumer_key, &options);
        for (key, value) in after_oauth {
            signer.parameter_encoded(&encode(key), value);
        }

        let header = signer.finish().authorization;
        Ok(match self.parameters.realm {
            Some(ref realm) => format!("{},{}=\"{}\"", header, REALM_KEY, encode(realm)),
            None => header,
        })
    }
}

/// RFC 5849 section 3.6 percent-encoding.
fn encode(value: &str) -> String {
    utf8_percent_encode(value, UNRESERVED).to_string()
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::{ConsumerCredentials, Secrets, TokenPair};

    /// Reads one `oauth_*` field from an `Authorization` header, percent-decoded.
    pub(crate) fn header_field(header: &str, name: &str) -> Option<String> {
        header
            .strip_prefix("OAuth ")?
            .split(',')
            .filter_map(|item| {
                let mut kv = item.trim().splitn(2, '=');
                Some((kv.next()?, kv.next()?))
            })
            .find(|(key, _)| *key == name)
            .map(|(_, value)| {
                percent_encoding::percent_decode_str(value.trim_matches('"'))
                    .decode_utf8_lossy()
                    .to_string()
            })
    }

    fn rfc_consumer() -> ConsumerCredentials {
        ConsumerCredentials::new("dpf43f3p2l4k3l03", "kd94hf93k423kf44").unwrap()
    }

    #[test]
    fn temporary_credentials_request() {
        // RFC 5849 section 1.2, temporary credentials
        let consumer = rfc_consumer();
        let secrets = Secrets::new(&consumer);
        let params = OAuthParameters::new()
            .nonce("wIjqoS")
            .timestamp(137_131_200u64)
            .callback("http://printer.example.com/ready")
            .realm("photos");
        let url = Url::parse("https://photos.example.net/initiate").unwrap();

        let header = Signer::new(&secrets, params)
            .authorization(&Method::POST, &url, None)
            .unwrap();

        assert_eq!(
            header_field(&header, "oauth_signature").unwrap(),
            "74KNZJeDHnMBp0EMJ9ZHt/XKycU="
        );
        assert_eq!(
            header_field(&header, "oauth_callback").unwrap(),
            "http://printer.example.com/ready"
        );
        assert!(header.ends_with(",realm=\"photos\""));
    }

    #[test]
    fn protected_resource_request_with_query() {
        // RFC 5849 section 1.2, accessing protected resources
        let consumer = rfc_consumer();
        let token = TokenPair::new("nnch734d00sl2jdk", "pfkkdhi9sl3r4s00");
        let secrets = Secrets::new(&consumer).token(&token);
        let params = OAuthParameters::new()
            .nonce("chapoH")
            .timestamp(137_131_202u64)
            .realm("Photos");
        let url =
            Url::parse("http://photos.example.net/photos?file=vacation.jpg&size=original").unwrap();

        let header = Signer::new(&secrets, params)
            .authorization(&Method::GET, &url, None)
            .unwrap();

        assert_eq!(
            header_field(&header, "oauth_signature").unwrap(),
            "MdpQcU8iPSUjWoN/UDMsK2sui9I="
        );
        assert_eq!(
            header_field(&header, "oauth_token").unwrap(),
            "nnch734d00sl2jdk"
        );
    }

    #[test]
    fn form_body_is_signed() {
        // https://developer.twitter.com/en/docs/authentication/oauth-1-0a/creating-a-signature
        let consumer = ConsumerCredentials::new(
            "xvz1evFS4wEEPTGEFPHBog",
            "kAcSOqF21Fu85e7zjz7ZN2U4ZRhfV3WpwPAoE3Z7kBw",
        )
        .unwrap();
        let token = TokenPair::new(
            "370773112-GmHxMAgYyLbNEtIKZeRNFsMKPR9EyMZeS9weJAEb",
            "LswwdoUaIvS8ltyTt5jkRh4J50vUPVVHtR2YPi5kE",
        );
        let secrets = Secrets::new(&consumer).token(&token);
        let params = OAuthParameters::new()
            .nonce("kYjzVBB8Y0ZFabxSWbWovY3uYSQ2pTgmZeNu2VS4cg")
            .timestamp(1_318_622_958u64)
            .version(true);
        let url = Url::parse("https://api.twitter.com/1.1/statuses/update.json").unwrap();
        let body = serde_urlencoded::to_string(&[
            ("include_entities", "true"),
            ("status", "Hello Ladies + Gentlemen, a signed OAuth request!"),
        ])
        .unwrap();

        let header = Signer::new(&secrets, params)
            .authorization(&Method::POST, &url, Some(&body))
            .unwrap();

        assert_eq!(
            header_field(&header, "oauth_signature").unwrap(),
            "hCtSmYh+iHYCEqBWrE7C7hYmtUk="
        );
        assert_eq!(header_field(&header, "oauth_version").unwrap(), "1.0");
    }

    #[test]
    fn verifier_and_generated_nonce_are_present() {
        let consumer = ConsumerCredentials::new("K", "S").unwrap();
        let token = TokenPair::new("request-token", "request-secret");
        let secrets = Secrets::new(&consumer).token(&token);
        let params = OAuthParameters::new().verifier("pin-1234");
        let url = Url::parse("https://api.example.com/oauth/access_token").unwrap();

        let header = Signer::new(&secrets, params)
            .authorization(&Method::POST, &url, None)
            .unwrap();

        assert_eq!(header_field(&header, "oauth_verifier").unwrap(), "pin-1234");
        assert_eq!(header_field(&header, "oauth_consumer_key").unwrap(), "K");
        assert_eq!(
            header_field(&header, "oauth_signature_method").unwrap(),
            "HMAC-SHA1"
        );
        assert!(!header_field(&header, "oauth_nonce").unwrap().is_empty());
        assert!(header_field(&header, "oauth_timestamp")
            .unwrap()
            .parse::<u64>()
            .is_ok());
        assert!(header_field(&header, "oauth_version").is_none());
    }

    #[test]
    fn body_does_not_leak_into_header() {
        let consumer = ConsumerCredentials::new("K", "S").unwrap();
        let secrets = Secrets::new(&consumer);
        let url = Url::parse("https://api.example.com/post?b=2").unwrap();

        let header = Signer::new(&secrets, OAuthParameters::new())
            .authorization(&Method::POST, &url, Some("a=1"))
            .unwrap();

        assert!(header_field(&header, "a").is_none());
        assert!(header_field(&header, "b").is_none());
    }

    #[test]
    fn oauth_parameters_in_query_or_form_are_refused() {
        let consumer = ConsumerCredentials::new("K", "S").unwrap();
        let secrets = Secrets::new(&consumer);
        let signer = Signer::new(&secrets, OAuthParameters::new());

        let url = Url::parse("https://api.example.com/post?oauth_token=spoofed").unwrap();
        assert!(matches!(
            signer.authorization(&Method::POST, &url, None),
            Err(Error::Request(_))
        ));
        let url = Url::parse("https://api.example.com/post").unwrap();
        assert!(matches!(
            signer.authorization(&Method::POST, &url, Some("oauth_extra=1")),
            Err(Error::Request(_))
        ));
    }

    fn signature_of(query: &str) -> String {
        let consumer = ConsumerCredentials::new("K", "S").unwrap();
        let secrets = Secrets::new(&consumer);
        let params = OAuthParameters::new().nonce("n").timestamp(1u64);
        let url = Url::parse(&format!("https://api.example.com/x{}", query)).unwrap();
        let header = Signer::new(&secrets, params)
            .authorization(&Method::GET, &url, None)
            .unwrap();
        header_field(&header, "oauth_signature").unwrap()
    }

    #[test]
    fn parameters_are_encoded_before_sorting() {
        assert_eq!(signature_of("?b=2"), "cdKVCRTpGxVYb+iPcdX8cvNBYrE=");
        // reserved characters in names
        assert_eq!(signature_of("?a%2F=2"), "FBzLjtyqg/Lw+Emj9cAn2lTyxTM=");
        assert_eq!(
            signature_of("?a.=1&a%2F=2"),
            "OegwGlBhAdlir9AIBKMXlITQzus="
        );
        // "x%2Fy" sorts before "x.y" once encoded
        assert_eq!(
            signature_of("?a=x%2Fy&a=x.y"),
            "YVHxREQXd4g5mxPBYKq5xO7yTHg="
        );
        assert_eq!(
            signature_of("?tags%5B%5D=%C3%BC&b=c%20d"),
            "igE0b2n0EqZ9h6lcT9RPjHsywEk="
        );
    }

    #[test]
    fn realm_is_escaped() {
        let consumer = ConsumerCredentials::new("K", "S").unwrap();
        let secrets = Secrets::new(&consumer);
        let url = Url::parse("https://api.example.com/x").unwrap();

        let header = Signer::new(&secrets, OAuthParameters::new().realm("a\"b c"))
            .authorization(&Method::GET, &url, None)
            .unwrap();

        assert!(header.ends_with(",realm=\"a%22b%20c\""));
    }
}
