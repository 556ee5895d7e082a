//! User-facing onboarding lines in the two supported locales

use securepulse::identity::{Locale, Plan};

pub fn provisioning(locale: Locale) -> &'static str {
    match locale {
        Locale::EnCa => "Provisioning your tenant...",
        Locale::FrCa => "Provisionnement de votre locataire...",
    }
}

pub fn ready(locale: Locale) -> &'static str {
    match locale {
        Locale::EnCa => "Your tenant is ready!",
        Locale::FrCa => "Votre locataire est prêt!",
    }
}

pub fn failed(locale: Locale) -> &'static str {
    match locale {
        Locale::EnCa => "Provisioning failed. Please contact support.",
        Locale::FrCa => "Le provisionnement a échoué. Veuillez contacter le support.",
    }
}

pub fn poll_error(locale: Locale) -> &'static str {
    match locale {
        Locale::EnCa => "Error during provisioning",
        Locale::FrCa => "Erreur lors du provisionnement",
    }
}

/// Shown when the Identity Service cannot be reached: what onboarding would
/// have done, so the flow can still be demonstrated.
pub fn backend_unavailable(locale: Locale, plan: Option<Plan>) -> String {
    let plan = plan.map(|p| p.to_string()).unwrap_or_else(|| "-".to_string());

    match locale {
        Locale::EnCa => format!(
            "Backend service not available (demo mode).\n\
             Selected plan: {}\n\n\
             With the Identity Service online this would:\n\
             1. POST to Identity Service /api/onboard\n\
             2. Get the Entra ID admin consent URL\n\
             3. Redirect for Microsoft authentication\n\
             4. Trigger the provisioning workflow\n\
             5. Send a Teams notification\n\
             6. Activate your tenant automatically",
            plan
        ),
        Locale::FrCa => format!(
            "Service backend non disponible (mode démo).\n\
             Forfait sélectionné: {}\n\n\
             Avec le Service d'Identité en ligne, cela:\n\
             1. POST au Service d'Identité /api/onboard\n\
             2. Obtiendrait l'URL de consentement admin Entra ID\n\
             3. Redirigerait pour l'authentification Microsoft\n\
             4. Déclencherait le workflow de provisionnement\n\
             5. Enverrait une notification Teams\n\
             6. Activerait votre locataire automatiquement",
            plan
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_unavailable_mentions_plan() {
        let text = backend_unavailable(Locale::EnCa, Some(Plan::Enterprise));
        assert!(text.contains("Selected plan: enterprise"));
        assert!(text.contains("/api/onboard"));

        let text = backend_unavailable(Locale::FrCa, None);
        assert!(text.starts_with("Service backend non disponible"));
    }
}
