//! Safe Account CLI
//!
//! Derives counterfactual Safe accounts and builds, signs and submits their user
//! operations.

use alloy::primitives::{Address, Bytes, U256};
use clap::{Args, Parser, Subcommand};
use safe_account_kit::rpc::{BundlerClient, NodeRpcClient};
use safe_account_kit::safe::digest::{user_operation_eip712_hash, DigestOverrides};
use safe_account_kit::safe::owner::PasskeyCoordinates;
use safe_account_kit::safe::{factory, AccountOverrides, SafeVersion};
use safe_account_kit::wallet::{sign_user_operation, OwnerWallet, PRIVATE_KEY_ENV};
use safe_account_kit::{
    Config, Error, MetaTransaction, ModuleConfiguration, Result, RpcConfig, SafeAccount, Signer,
    UserOperation, UserOperationOverrides,
};
use std::path::PathBuf;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[derive(Parser)]
#[command(name = "safe-account")]
#[command(about = "Counterfactual Safe accounts and ERC-4337 user operations")]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Path to config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

/// Initial owners of a new account
#[derive(Args, Debug, Clone)]
struct OwnerArgs {
    /// Owner address (repeatable)
    #[arg(long = "owner")]
    owners: Vec<Address>,

    /// Passkey owner as `x,y` public key coordinates
    #[arg(long)]
    passkey: Option<PasskeyCoordinates>,

    /// Signatures required (defaults to the config file value, then 1)
    #[arg(long)]
    threshold: Option<u64>,

    /// CREATE2 salt nonce
    #[arg(long)]
    salt: Option<U256>,
}

impl OwnerArgs {
    fn signers(&self) -> Vec<Signer> {
        self.owners
            .iter()
            .copied()
            .map(Signer::Address)
            .chain(self.passkey.map(Signer::Passkey))
            .collect()
    }

    fn module_configuration(&self, base: &ModuleConfiguration) -> ModuleConfiguration {
        ModuleConfiguration {
            threshold: self.threshold.or(base.threshold),
            c2_nonce: self.salt.or(base.c2_nonce),
            ..base.clone()
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Print the counterfactual address of a new account
    Address {
        #[command(flatten)]
        owners: OwnerArgs,
    },

    /// Print the init code deploying a new account
    InitCode {
        #[command(flatten)]
        owners: OwnerArgs,
    },

    /// Assemble a user operation for one call and print it as JSON
    Build {
        /// Existing account address; derives a new account from the owners when absent
        #[arg(long, conflicts_with_all = ["owners", "passkey", "salt"])]
        sender: Option<Address>,

        #[command(flatten)]
        owners: OwnerArgs,

        /// Call target
        #[arg(long)]
        to: Address,

        /// Value in wei
        #[arg(long, default_value = "0")]
        value: U256,

        /// Calldata (hex encoded)
        #[arg(long, default_value = "0x")]
        data: Bytes,

        /// Nonce override; read from the EntryPoint when absent
        #[arg(long)]
        nonce: Option<U256>,

        /// Sign with PRIVATE_KEY and submit to the bundler
        #[arg(long)]
        send: bool,
    },

    /// Print the SafeOp digest of a user operation JSON file
    Digest {
        /// Path to the user operation JSON
        #[arg(long)]
        user_op: PathBuf,

        /// Earliest validity timestamp
        #[arg(long)]
        valid_after: Option<u64>,

        /// Expiry timestamp
        #[arg(long)]
        valid_until: Option<u64>,

        /// Also sign the digest with PRIVATE_KEY and print the packed signature
        #[arg(long)]
        sign: bool,
    },

    /// Show current configuration
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (ignore if not found)
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();

    let config = match cli.config {
        Some(path) => Config::from_file(&path)?,
        None => Config::default(),
    };

    match cli.command {
        Commands::Address { owners } => {
            let module_config = owners.module_configuration(&config.account);
            let address = factory::derive_address_only(
                &owners.signers(),
                &module_config,
                &SafeVersion::default(),
            )?;
            println!("{}", address);
        }
        Commands::InitCode { owners } => {
            let module_config = owners.module_configuration(&config.account);
            let init_code =
                SafeAccount::create_init_code(&owners.signers(), &module_config)?;
            println!("{}", init_code);
        }
        Commands::Build {
            sender,
            owners,
            to,
            value,
            data,
            nonce,
            send,
        } => {
            let tx = MetaTransaction::call(to, value, data);
            run_build(&config, sender, owners, tx, nonce, send).await?;
        }
        Commands::Digest {
            user_op,
            valid_after,
            valid_until,
            sign,
        } => {
            run_digest(&config, user_op, valid_after, valid_until, sign).await?;
        }
        Commands::Config => {
            println!("{}", serde_json::to_string_pretty(&config)?);
        }
    }

    Ok(())
}

async fn run_build(
    config: &Config,
    sender: Option<Address>,
    owners: OwnerArgs,
    tx: MetaTransaction,
    nonce: Option<U256>,
    send: bool,
) -> Result<()> {
    let account = match sender {
        Some(address) => SafeAccount::new(
            address,
            AccountOverrides {
                safe_4337_module_address: config.account.safe_4337_module_address,
                entrypoint_address: config.account.entrypoint_address,
                threshold: owners.threshold.or(config.account.threshold),
            },
        ),
        None => SafeAccount::initialize_new_account(
            &owners.signers(),
            &owners.module_configuration(&config.account),
        )?,
    };

    let rpc_config = RpcConfig::from_env();
    let node = NodeRpcClient::from_rpc_config(&rpc_config, config.chain_id)
        .map_err(|e| Error::Config(e.to_string()))?;
    let bundler = BundlerClient::from_rpc_config(&rpc_config, config.chain_id)
        .map_err(|e| Error::Config(e.to_string()))?;

    tracing::info!(
        sender = %account.address(),
        chain_id = config.chain_id,
        pending_deployment = account.deployment().is_pending(),
        "Assembling user operation"
    );

    let mut overrides = UserOperationOverrides {
        nonce,
        ..Default::default()
    };
    config.gas.apply(&mut overrides);

    let mut user_operation = account
        .create_user_operation(std::slice::from_ref(&tx), &node, &bundler, &overrides)
        .await?;

    if send {
        let wallet = OwnerWallet::from_env(PRIVATE_KEY_ENV)?;
        let digest_overrides = DigestOverrides {
            entrypoint_address: Some(account.entrypoint()),
            safe_4337_module_address: Some(account.safe_4337_module()),
            ..Default::default()
        };
        user_operation.signature = sign_user_operation(
            &user_operation,
            config.chain_id,
            std::slice::from_ref(&wallet),
            &digest_overrides,
        )
        .await?;

        let hash = bundler
            .send_user_operation(&user_operation, account.entrypoint())
            .await
            .map_err(|e| Error::Bundler(e.to_string()))?;
        println!("{}", hash);
    } else {
        println!("{}", serde_json::to_string_pretty(&user_operation)?);
    }

    Ok(())
}

async fn run_digest(
    config: &Config,
    path: PathBuf,
    valid_after: Option<u64>,
    valid_until: Option<u64>,
    sign: bool,
) -> Result<()> {
    let content = std::fs::read_to_string(&path)
        .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
    let user_operation: UserOperation = serde_json::from_str(&content)?;

    let overrides = DigestOverrides {
        valid_after,
        valid_until,
        entrypoint_address: config.account.entrypoint_address,
        safe_4337_module_address: config.account.safe_4337_module_address,
    };
    let digest = user_operation_eip712_hash(&user_operation, config.chain_id, &overrides)?;
    println!("{}", digest);

    if sign {
        let wallet = OwnerWallet::from_env(PRIVATE_KEY_ENV)?;
        tracing::info!(owner = %wallet.address(), "Signing SafeOp digest");
        let signature = sign_user_operation(
            &user_operation,
            config.chain_id,
            std::slice::from_ref(&wallet),
            &overrides,
        )
        .await?;
        println!("{}", signature);
    }

    Ok(())
}
