use certwright_pki::{CertificateTemplate, PkiError, TemplateBuilder};

use crate::{
    api::{CertificateRequest, IssuerConfig},
    error::Result,
    options::IssuerOptions,
};

/// Build the certificate template for a request.
///
/// The request's duration and usages fall back to the issuer defaults. The
/// issuer's CRL distribution points replace whatever the request carried,
/// an empty list included.
pub fn generate_template(
    request: &CertificateRequest,
    issuer: &IssuerConfig,
    options: &IssuerOptions,
) -> Result<CertificateTemplate> {
    let duration = request
        .spec
        .duration
        .unwrap_or_else(|| options.default_duration());
    if duration < options.minimum_duration() {
        return Err(PkiError::GenerationError(format!(
            "certificate duration {} is less than the minimum {}",
            duration,
            options.minimum_duration()
        ))
        .into());
    }

    let usages = if request.spec.usages.is_empty() {
        &options.default_usages
    } else {
        &request.spec.usages
    };

    let mut template = TemplateBuilder::new(&request.spec.request)
        .duration(duration)
        .is_ca(request.spec.is_ca)
        .usages(usages)
        .build()?;

    template.set_crl_distribution_points(issuer.self_signed.crl_distribution_points.clone());

    Ok(template)
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use certwright_key::PrivateKey;
    use certwright_pki::{create_csr, KeyUsage, SubjectAltNames};
    use time::Duration;
    use x509_cert::name::Name;

    use super::*;
    use crate::error::IssuerError;

    fn request() -> CertificateRequest {
        let key = PrivateKey::ed25519_from_seed(&[11u8; 32]);
        let csr = create_csr(
            &key,
            Name::from_str("CN=app.example.com").unwrap(),
            &SubjectAltNames::default(),
        )
        .unwrap();
        CertificateRequest::new("default", "cr", csr.to_pem().unwrap())
    }

    #[test]
    fn test_defaults_apply() {
        let options = IssuerOptions::default().with_default_usages(&[KeyUsage::ClientAuth]);
        let template =
            generate_template(&request(), &IssuerConfig::cluster("selfsigned"), &options).unwrap();

        assert_eq!(template.duration, options.default_duration());
        assert!(template.key_usages.is_empty());
        assert_eq!(template.extended_key_usages, vec![KeyUsage::ClientAuth]);
    }

    #[test]
    fn test_request_values_win_over_defaults() {
        let request = request()
            .with_duration(Duration::hours(12))
            .with_usages(&[KeyUsage::KeyAgreement])
            .with_is_ca(true);
        let template = generate_template(
            &request,
            &IssuerConfig::cluster("selfsigned"),
            &IssuerOptions::default(),
        )
        .unwrap();

        assert_eq!(template.duration, Duration::hours(12));
        assert!(template.is_ca);
        assert_eq!(template.key_usages, vec![KeyUsage::KeyAgreement, KeyUsage::CertSign]);
    }

    #[test]
    fn test_issuer_crl_points_applied() {
        let issuer = IssuerConfig::namespaced("default", "selfsigned")
            .with_crl_distribution_points(vec!["http://crl.example.com".to_string()]);
        let template = generate_template(&request(), &issuer, &IssuerOptions::default()).unwrap();
        assert_eq!(template.crl_distribution_points, vec!["http://crl.example.com".to_string()]);
    }

    #[test]
    fn test_duration_below_minimum_fails() {
        let request = request().with_duration(Duration::minutes(30));
        let err = generate_template(
            &request,
            &IssuerConfig::cluster("selfsigned"),
            &IssuerOptions::default(),
        )
        .unwrap_err();
        assert!(matches!(err, IssuerError::Pki(PkiError::GenerationError(_))));
    }
}
