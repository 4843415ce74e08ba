//! Mint transaction composition and submission.
//!
//! Encodes the wrapper-contract call for one mint attempt and pushes it
//! through the wallet session. User rejection is recognized across wallets
//! and kept soft; everything else is a hard submission error.

use alloy::primitives::{Address, U256, address};
use alloy::sol;
use alloy::sol_types::SolCall;
use pd_api_types::MintRequest;
use pd_referral::FALLBACK_REWARD_ADDRESS;
use pd_wallet_session::{PreparedTransaction, ProviderError, WalletSessionManager};
use tracing::{debug, info};

sol! {
    /// Wrapper-contract entrypoint: forwards the mint to the art contract
    /// and routes the referral reward.
    function mint(uint256 tokenId, address sendMintsTo, uint256 count, address sendRewardsTo) payable;
}

/// Intermediary contract that forwards mint calls and routes referral
/// rewards.
pub const WRAPPER_CONTRACT: Address = address!("aff1a9e200000061fc3283455d8b0c7e3e728161");

pub const REQUIRED_CHAIN_ID: u64 = 8453;
pub const CHAIN_LABEL: &str = "Base";

/// Mint price per canvas edition, in wei (0.0026 ETH).
pub const UNIT_PRICE_WEI: u128 = 2_600_000_000_000_000;

/// Compile-time copy of [`pd_referral::FALLBACK_REWARD_ADDRESS`]; equality is
/// asserted in tests.
const FALLBACK_REWARD: Address = address!("a9f1e2c3b44dd064259bd2b8a38b3f6f58cc0a1e");

#[derive(Debug, thiserror::Error)]
pub enum MintError {
    #[error("wallet not connected")]
    NotConnected,
    #[error("quantity must be at least 1")]
    InvalidQuantity,
    #[error("invalid recipient address: {0}")]
    InvalidRecipient(String),
    #[error("transaction rejected by user")]
    Rejected,
    #[error("mint submission failed: {0}")]
    Submit(String),
}

/// Encode the wrapper-contract call for one mint attempt.
///
/// `value` is `unit_price * quantity` in `U256` integer arithmetic. The mint
/// target is an opaque referral token; when it is not an address the reward
/// goes to the fixed fallback recipient instead of failing the mint.
pub fn build_mint_transaction(
    request: &MintRequest,
    recipient: &str,
) -> Result<PreparedTransaction, MintError> {
    if request.quantity == 0 {
        return Err(MintError::InvalidQuantity);
    }
    let recipient: Address = recipient
        .parse()
        .map_err(|_| MintError::InvalidRecipient(recipient.to_owned()))?;
    let reward_target = request
        .mint_target
        .parse::<Address>()
        .unwrap_or_else(|_| {
            debug!(
                "referral token {:?} is not an address; rewards go to the fallback recipient",
                request.mint_target
            );
            FALLBACK_REWARD
        });

    let value = U256::from(request.unit_price_wei) * U256::from(request.quantity);
    let call = mintCall {
        tokenId: U256::from(request.canvas_id),
        sendMintsTo: recipient,
        count: U256::from(request.quantity),
        sendRewardsTo: reward_target,
    };

    Ok(PreparedTransaction {
        to: WRAPPER_CONTRACT.to_string(),
        data: format!("0x{}", alloy::hex::encode(call.abi_encode())),
        value: format!("0x{value:x}"),
    })
}

/// True when the provider error is the user declining the signature, in any
/// of the shapes the various wallets produce.
pub fn is_user_rejection(err: &ProviderError) -> bool {
    if err.code == Some(4001) {
        return true;
    }
    if err.name.as_deref() == Some("UserRejectedRequestError") {
        return true;
    }
    let message = err.message.to_lowercase();
    message.contains("user denied")
        || message.contains("user rejected")
        || message.contains("rejected the request")
}

/// Build and submit a mint through the wallet session. Refuses when no
/// wallet is connected rather than letting the provider fail opaquely.
pub async fn submit_mint(
    session: &WalletSessionManager,
    request: &MintRequest,
) -> Result<String, MintError> {
    let Some(recipient) = session.session().address().map(ToOwned::to_owned) else {
        return Err(MintError::NotConnected);
    };

    let tx = build_mint_transaction(request, &recipient)?;
    match session.send_transaction(&tx).await {
        Ok(tx_hash) => Ok(tx_hash),
        Err(err) if is_user_rejection(&err) => {
            info!("mint signature rejected by user");
            Err(MintError::Rejected)
        }
        Err(err) => Err(MintError::Submit(err.message)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use pd_api_types::{ConnectorDescriptor, NullNoticeSink};
    use pd_wallet_session::WalletProvider;
    use std::cell::RefCell;
    use std::rc::Rc;
    use std::str::FromStr;

    fn request(mint_target: &str) -> MintRequest {
        MintRequest {
            canvas_id: 5,
            quantity: 3,
            unit_price_wei: 2_600_000_000_000_000,
            mint_target: mint_target.to_owned(),
        }
    }

    const RECIPIENT: &str = "0x1111111111111111111111111111111111111111";

    #[test]
    fn fallback_constants_agree() {
        assert_eq!(
            FALLBACK_REWARD,
            Address::from_str(FALLBACK_REWARD_ADDRESS).expect("fallback address")
        );
    }

    #[test]
    fn value_is_exact_integer_product() {
        let tx = build_mint_transaction(&request("0xABC"), RECIPIENT).expect("tx");
        let value = U256::from_str(&tx.value).expect("hex value");
        assert_eq!(value, U256::from(7_800_000_000_000_000u64));
    }

    #[test]
    fn no_precision_loss_for_large_quantities() {
        let req = MintRequest {
            canvas_id: 700,
            quantity: 1_000_000,
            unit_price_wei: 2_600_000_000_000_000,
            mint_target: String::new(),
        };
        let tx = build_mint_transaction(&req, RECIPIENT).expect("tx");
        let value = U256::from_str(&tx.value).expect("hex value");
        assert_eq!(value, U256::from(2_600_000_000_000_000_000_000u128));
    }

    #[test]
    fn calldata_targets_wrapper_with_expected_arguments() {
        let target = "0x2222222222222222222222222222222222222222";
        let tx = build_mint_transaction(&request(target), RECIPIENT).expect("tx");

        assert_eq!(tx.to, WRAPPER_CONTRACT.to_string());
        let selector = format!("0x{}", alloy::hex::encode(mintCall::SELECTOR));
        assert!(tx.data.starts_with(&selector));
        // selector + 4 words
        assert_eq!(tx.data.len(), 2 + 8 + 4 * 64);
        // Both addresses appear as encoded words.
        assert!(tx.data.contains(&RECIPIENT[2..].to_lowercase()));
        assert!(tx.data.contains(&target[2..].to_lowercase()));
    }

    #[test]
    fn opaque_referral_token_falls_back_to_fixed_reward_address() {
        let tx = build_mint_transaction(&request("painter-campaign"), RECIPIENT).expect("tx");
        assert!(tx.data.contains(&FALLBACK_REWARD_ADDRESS[2..]));
    }

    #[test]
    fn zero_quantity_is_refused() {
        let mut req = request("0xABC");
        req.quantity = 0;
        assert!(matches!(
            build_mint_transaction(&req, RECIPIENT),
            Err(MintError::InvalidQuantity)
        ));
    }

    #[test]
    fn rejection_recognized_across_wallet_error_shapes() {
        let by_code = ProviderError {
            code: Some(4001),
            name: None,
            message: "request failed".to_owned(),
        };
        let by_name = ProviderError {
            code: None,
            name: Some("UserRejectedRequestError".to_owned()),
            message: "request failed".to_owned(),
        };
        let by_message = ProviderError {
            code: None,
            name: None,
            message: "MetaMask Tx Signature: User denied transaction signature.".to_owned(),
        };
        let revert = ProviderError {
            code: Some(-32000),
            name: Some("ContractFunctionExecutionError".to_owned()),
            message: "execution reverted".to_owned(),
        };

        assert!(is_user_rejection(&by_code));
        assert!(is_user_rejection(&by_name));
        assert!(is_user_rejection(&by_message));
        assert!(!is_user_rejection(&revert));
    }

    /// Provider whose submit outcome is scripted per test.
    struct ScriptedProvider {
        submit_result: RefCell<Result<String, ProviderError>>,
    }

    #[async_trait(?Send)]
    impl WalletProvider for ScriptedProvider {
        fn connectors(&self) -> Vec<ConnectorDescriptor> {
            vec![ConnectorDescriptor {
                id: "walletConnect".to_owned(),
                display_name: "WalletConnect".to_owned(),
                embedded: false,
            }]
        }

        async fn connect(&self, _connector_id: &str) -> anyhow::Result<(String, u64)> {
            Ok((RECIPIENT.to_owned(), REQUIRED_CHAIN_ID))
        }

        async fn disconnect(&self) -> anyhow::Result<()> {
            Ok(())
        }

        async fn switch_chain(&self, _chain_id: u64) -> anyhow::Result<()> {
            Ok(())
        }

        async fn send_transaction(
            &self,
            _tx: &PreparedTransaction,
        ) -> Result<String, ProviderError> {
            self.submit_result.borrow().clone()
        }
    }

    fn session_with(provider: Rc<ScriptedProvider>) -> WalletSessionManager {
        WalletSessionManager::new(
            provider,
            REQUIRED_CHAIN_ID,
            CHAIN_LABEL,
            Rc::new(NullNoticeSink),
        )
    }

    #[tokio::test]
    async fn submit_refuses_without_connected_wallet() {
        let session = session_with(Rc::new(ScriptedProvider {
            submit_result: RefCell::new(Ok("0xhash".to_owned())),
        }));

        assert!(matches!(
            submit_mint(&session, &request("0xABC")).await,
            Err(MintError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn submit_classifies_rejection_as_soft() {
        let provider = Rc::new(ScriptedProvider {
            submit_result: RefCell::new(Err(ProviderError {
                code: Some(4001),
                name: None,
                message: "User rejected the request.".to_owned(),
            })),
        });
        let session = session_with(provider.clone());
        session.connect("walletConnect").await;

        assert!(matches!(
            submit_mint(&session, &request("0xABC")).await,
            Err(MintError::Rejected)
        ));

        // The session stays connected and interactive for a retry.
        assert!(session.session().is_connected());
        *provider.submit_result.borrow_mut() = Ok("0xhash".to_owned());
        assert_eq!(
            submit_mint(&session, &request("0xABC")).await.expect("hash"),
            "0xhash"
        );
    }

    #[tokio::test]
    async fn submit_surfaces_other_failures_with_message() {
        let session = session_with(Rc::new(ScriptedProvider {
            submit_result: RefCell::new(Err(ProviderError::message("execution reverted"))),
        }));
        session.connect("walletConnect").await;

        match submit_mint(&session, &request("0xABC")).await {
            Err(MintError::Submit(message)) => assert_eq!(message, "execution reverted"),
            other => panic!("expected hard submit error, got {other:?}"),
        }
    }
}
