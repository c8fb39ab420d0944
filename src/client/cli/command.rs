//! # Akash Command Builder
//!
//! Fluent builder for `akash` invocations. It only assembles arguments;
//! running them is the job of a [`CommandRunner`](super::CommandRunner).

use crate::client::remote::Seqs;
use crate::client::settings::ProviderSettings;

const GAS: &str = "auto";
const GAS_ADJUSTMENT: &str = "1.5";
const GAS_PRICES: &str = "0.025uakt";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AkashCommand {
    program: String,
    args: Vec<String>,
}

impl AkashCommand {
    #[must_use]
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Start a command against the binary named in `settings`
    #[must_use]
    pub fn for_settings(settings: &ProviderSettings) -> Self {
        Self::new(settings.path.clone())
    }

    #[must_use]
    pub fn program(&self) -> &str {
        &self.program
    }

    #[must_use]
    pub fn args(&self) -> &[String] {
        &self.args
    }

    /// Whether this command broadcasts a transaction
    #[must_use]
    pub fn is_transaction(&self) -> bool {
        self.args.first().is_some_and(|a| a == "tx")
    }

    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    #[must_use]
    fn flag(self, name: &str, value: impl Into<String>) -> Self {
        self.arg(format!("--{name}")).arg(value)
    }

    // Subcommands

    #[must_use]
    pub fn tx(self) -> Self {
        self.arg("tx")
    }

    #[must_use]
    pub fn query(self) -> Self {
        self.arg("query")
    }

    #[must_use]
    pub fn deployment(self) -> Self {
        self.arg("deployment")
    }

    #[must_use]
    pub fn market(self) -> Self {
        self.arg("market")
    }

    #[must_use]
    pub fn lease(self) -> Self {
        self.arg("lease")
    }

    #[must_use]
    pub fn bid(self) -> Self {
        self.arg("bid")
    }

    #[must_use]
    pub fn keys(self) -> Self {
        self.arg("keys")
    }

    #[must_use]
    pub fn create(self) -> Self {
        self.arg("create")
    }

    #[must_use]
    pub fn update(self) -> Self {
        self.arg("update")
    }

    #[must_use]
    pub fn close(self) -> Self {
        self.arg("close")
    }

    #[must_use]
    pub fn get(self) -> Self {
        self.arg("get")
    }

    #[must_use]
    pub fn list(self) -> Self {
        self.arg("list")
    }

    #[must_use]
    pub fn show(self, key_name: &str) -> Self {
        self.arg("show").arg(key_name)
    }

    #[must_use]
    pub fn import(self, key_name: &str, key_file: &str) -> Self {
        self.arg("import").arg(key_name).arg(key_file)
    }

    /// `keys delete`, skipping the confirmation prompt
    #[must_use]
    pub fn delete(self, key_name: &str) -> Self {
        self.arg("delete").arg(key_name).auto_accept()
    }

    #[must_use]
    pub fn send_manifest(self, manifest: &str) -> Self {
        self.arg("send-manifest").arg(manifest)
    }

    // Flags

    #[must_use]
    pub fn set_dseq(self, dseq: &str) -> Self {
        self.flag("dseq", dseq)
    }

    #[must_use]
    pub fn set_gseq(self, gseq: &str) -> Self {
        self.flag("gseq", gseq)
    }

    #[must_use]
    pub fn set_oseq(self, oseq: &str) -> Self {
        self.flag("oseq", oseq)
    }

    #[must_use]
    pub fn set_seqs(self, seqs: &Seqs) -> Self {
        self.set_dseq(&seqs.dseq)
            .set_gseq(&seqs.gseq)
            .set_oseq(&seqs.oseq)
    }

    #[must_use]
    pub fn set_owner(self, owner: &str) -> Self {
        self.flag("owner", owner)
    }

    #[must_use]
    pub fn set_provider(self, provider: &str) -> Self {
        self.flag("provider", provider)
    }

    #[must_use]
    pub fn set_from(self, key_name: &str) -> Self {
        self.flag("from", key_name)
    }

    #[must_use]
    pub fn set_chain_id(self, chain_id: &str) -> Self {
        self.flag("chain-id", chain_id)
    }

    #[must_use]
    pub fn set_keyring_backend(self, backend: &str) -> Self {
        self.flag("keyring-backend", backend)
    }

    #[must_use]
    pub fn set_node(self, node: &str) -> Self {
        self.flag("node", node)
    }

    #[must_use]
    pub fn set_home(self, home: &str) -> Self {
        self.flag("home", home)
    }

    /// Transaction memo; omitted when empty
    #[must_use]
    pub fn set_note(self, note: &str) -> Self {
        if note.is_empty() {
            self
        } else {
            self.flag("note", note)
        }
    }

    #[must_use]
    pub fn default_gas(self) -> Self {
        self.flag("gas", GAS)
            .flag("gas-adjustment", GAS_ADJUSTMENT)
            .flag("gas-prices", GAS_PRICES)
    }

    #[must_use]
    pub fn auto_accept(self) -> Self {
        self.arg("-y")
    }

    #[must_use]
    pub fn address_only(self) -> Self {
        self.arg("-a")
    }

    #[must_use]
    pub fn output_json(self) -> Self {
        self.flag("output", "json")
    }

    /// Signing and routing flags every transaction carries
    #[must_use]
    pub fn signed_by(self, settings: &ProviderSettings, note: &str) -> Self {
        self.set_from(&settings.key_name)
            .set_keyring_backend(&settings.keyring_backend)
            .set_home(&settings.home)
            .set_chain_id(&settings.chain_id)
            .set_node(&settings.node)
            .set_note(note)
            .default_gas()
            .auto_accept()
            .output_json()
    }

    /// Routing flags every query carries
    #[must_use]
    pub fn routed_by(self, settings: &ProviderSettings) -> Self {
        self.set_chain_id(&settings.chain_id)
            .set_node(&settings.node)
            .output_json()
    }
}

impl std::fmt::Display for AkashCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}
