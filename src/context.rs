use std::path::Path;

use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};

use crate::error::{Error, Result};

const DEFAULT_NAMESPACE: &str = "default";

/// The kubeconfig context and namespace a rescale runs against.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Selection {
    pub context: String,
    pub namespace: String,
}

/// Pick the context (`--context`, else `current-context`) and namespace
/// (`--namespace`, else the context's, else `default`).
pub fn select(
    kubeconfig: &Kubeconfig,
    context: Option<&str>,
    namespace: Option<&str>,
) -> Result<Selection> {
    let context = match context.filter(|c| !c.is_empty()) {
        Some(requested) => requested,
        None => kubeconfig
            .current_context
            .as_deref()
            .filter(|c| !c.is_empty())
            .ok_or(Error::Context)?,
    };

    let named = kubeconfig
        .contexts
        .iter()
        .find(|named| named.name == context)
        .ok_or(Error::Context)?;

    let namespace = namespace
        .filter(|ns| !ns.is_empty())
        .map(str::to_owned)
        .or_else(|| named.context.as_ref().and_then(|c| c.namespace.clone()))
        .unwrap_or_else(|| DEFAULT_NAMESPACE.to_owned());

    Ok(Selection {
        context: context.to_owned(),
        namespace,
    })
}

/// Load the kubeconfig (from `path`, or `KUBECONFIG`/`~/.kube/config`) and
/// build a client for the selected context.
pub async fn connect(
    path: Option<&Path>,
    context: Option<&str>,
    namespace: Option<&str>,
) -> Result<(Client, Selection)> {
    let kubeconfig = match path {
        Some(path) => Kubeconfig::read_from(path)?,
        None => Kubeconfig::read()?,
    };
    let selection = select(&kubeconfig, context, namespace)?;
    log::debug!(
        "using context {} and namespace {}",
        selection.context,
        selection.namespace
    );

    let options = KubeConfigOptions {
        context: Some(selection.context.clone()),
        ..KubeConfigOptions::default()
    };
    let config = Config::from_custom_kubeconfig(kubeconfig, &options).await?;
    let client = Client::try_from(config)?;

    Ok((client, selection))
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: dev
clusters:
- name: local
  cluster:
    server: https://127.0.0.1:6443
users:
- name: admin
  user:
    token: secret
contexts:
- name: dev
  context:
    cluster: local
    user: admin
    namespace: apps
- name: prod
  context:
    cluster: local
    user: admin
"#;

    fn kubeconfig() -> Kubeconfig {
        Kubeconfig::from_yaml(KUBECONFIG).unwrap()
    }

    #[test]
    fn current_context_and_its_namespace_by_default() {
        let selection = select(&kubeconfig(), None, None).unwrap();
        assert_eq!(
            selection,
            Selection {
                context: "dev".to_owned(),
                namespace: "apps".to_owned(),
            }
        );
    }

    #[test]
    fn requested_context_without_namespace_uses_default() {
        let selection = select(&kubeconfig(), Some("prod"), None).unwrap();
        assert_eq!(selection.context, "prod");
        assert_eq!(selection.namespace, "default");
    }

    #[test]
    fn namespace_flag_wins() {
        let selection = select(&kubeconfig(), None, Some("web")).unwrap();
        assert_eq!(selection.namespace, "web");
    }

    #[test]
    fn unknown_context_is_rejected() {
        assert!(matches!(
            select(&kubeconfig(), Some("staging"), None),
            Err(Error::Context)
        ));
    }

    #[test]
    fn missing_current_context_is_rejected() {
        let mut kubeconfig = kubeconfig();
        kubeconfig.current_context = None;
        assert!(matches!(select(&kubeconfig, None, None), Err(Error::Context)));
    }
}
