/// Resolves the set of account ids to discover within: the configured
/// list when non-empty, otherwise every `ACTIVE` account in the
/// organization except the management account itself. Upstream
/// (Organizations) failures are swallowed here and logged — discovery as
/// a whole must not fail just because account resolution did.
pub async fn resolve_account_ids(
    organizations: &aws_sdk_organizations::Client,
    management_account_id: &str,
    configured: &[String],
) -> Vec<String> {
    if !configured.is_empty() {
        return configured.to_vec();
    }

    let mut account_ids = Vec::new();
    let mut next_token: Option<String> = None;

    loop {
        let mut req = organizations.list_accounts();
        if let Some(token) = &next_token {
            req = req.next_token(token);
        }

        let page = match req.send().await {
            Ok(page) => page,
            Err(e) => {
                tracing::warn!(error = %e, "failed to list organization accounts");
                return Vec::new();
            }
        };

        for account in page.accounts() {
            let (Some(id), Some(status)) = (account.id(), account.status()) else {
                continue;
            };
            if id == management_account_id {
                continue;
            }
            if status.as_str() == "ACTIVE" {
                account_ids.push(id.to_string());
            }
        }

        next_token = page.next_token().map(str::to_string);
        if next_token.is_none() {
            break;
        }
    }

    account_ids
}
