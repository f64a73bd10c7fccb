use crate::chain::{Address, Asset, InstructionKind, TokenProgram, TransactionRecord};
use crate::proto::TransferInfo;

/// How a payment shows up in a transaction, chosen once from the configured asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferExtractor {
    /// An SPL `transfer` / `transferChecked` instruction of `program`.
    Token { mint: Address, program: TokenProgram },
    /// The lamport balance change of `recipient`.
    Native { recipient: Address },
}

impl TransferExtractor {
    pub fn for_asset(asset: &Asset, recipient: &Address) -> Self {
        match asset {
            Asset::Native => TransferExtractor::Native {
                recipient: recipient.clone(),
            },
            Asset::Token(token) => TransferExtractor::Token {
                mint: token.mint.clone(),
                program: token.program,
            },
        }
    }

    /// Finds the payment in `record`, if any.
    pub fn extract(&self, record: &TransactionRecord) -> Option<TransferInfo> {
        match self {
            TransferExtractor::Token { mint, program } => extract_token(record, mint, *program),
            TransferExtractor::Native { recipient } => extract_native(record, recipient),
        }
    }
}

/// First token transfer of `program` wins. A `transferChecked` naming another mint is skipped.
fn extract_token(
    record: &TransactionRecord,
    mint: &Address,
    program: TokenProgram,
) -> Option<TransferInfo> {
    let program_id = program.id();
    record
        .instructions
        .iter()
        .filter(|instruction| *instruction.program_id.pubkey() == program_id)
        .find_map(|instruction| match &instruction.kind {
            InstructionKind::TokenTransfer(transfer) => {
                if transfer.mint.as_ref().is_some_and(|m| m != mint) {
                    return None;
                }
                Some(TransferInfo {
                    source: transfer.source.clone(),
                    destination: transfer.destination.clone(),
                    amount: transfer.amount,
                })
            }
            InstructionKind::Other => None,
        })
}

fn extract_native(record: &TransactionRecord, recipient: &Address) -> Option<TransferInfo> {
    let index = record.account_index(recipient)?;
    let delta = record.balance_delta(index)?;
    if delta <= 0 {
        return None;
    }
    let amount = u64::try_from(delta).ok()?;
    let source = record.fee_payer()?.clone();
    Some(TransferInfo {
        source,
        destination: recipient.clone(),
        amount,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chain::{AccountKey, Instruction, TokenTransferInstruction};
    use std::str::FromStr;

    fn address(s: &str) -> Address {
        Address::from_str(s).unwrap()
    }

    fn payer() -> Address {
        address("9WzDXwBbmkg8ZTbNMqUxvQRAyrZzDsGYdLVL9zYtAWWM")
    }

    fn recipient() -> Address {
        address("4zMMC9srt5Ri5X14GAgXhaHii3GnPAEERYPJgZJDncDU")
    }

    fn mint() -> Address {
        address("EPjFWdd5AufqSSqeM2qN1xzybapC8G4wEGGkZwyTDt1v")
    }

    fn record(instructions: Vec<Instruction>, pre: Vec<u64>, post: Vec<u64>) -> TransactionRecord {
        TransactionRecord {
            signature: "sig".to_string(),
            slot: 1,
            block_time: None,
            error: None,
            account_keys: vec![
                AccountKey {
                    address: payer(),
                    signer: true,
                },
                AccountKey {
                    address: recipient(),
                    signer: false,
                },
            ],
            pre_balances: pre,
            post_balances: post,
            instructions,
        }
    }

    fn transfer(program: TokenProgram, mint: Option<Address>, amount: u64) -> Instruction {
        Instruction {
            program_id: Address::new(program.id()),
            kind: InstructionKind::TokenTransfer(TokenTransferInstruction {
                source: payer(),
                destination: recipient(),
                authority: Some(payer()),
                mint,
                amount,
            }),
        }
    }

    #[test]
    fn test_token_first_matching_instruction_wins() {
        let other_mint = address("So11111111111111111111111111111111111111112");
        let extractor = TransferExtractor::Token {
            mint: mint(),
            program: TokenProgram::SplToken,
        };
        let tx = record(
            vec![
                transfer(TokenProgram::SplToken2022, None, 1),
                transfer(TokenProgram::SplToken, Some(other_mint), 2),
                transfer(TokenProgram::SplToken, Some(mint()), 3),
                transfer(TokenProgram::SplToken, None, 4),
            ],
            vec![],
            vec![],
        );
        let found = extractor.extract(&tx).unwrap();
        assert_eq!(found.amount, 3);
        assert_eq!(found.destination, recipient());
    }

    #[test]
    fn test_token_without_transfer() {
        let extractor = TransferExtractor::Token {
            mint: mint(),
            program: TokenProgram::SplToken,
        };
        let tx = record(
            vec![Instruction {
                program_id: Address::new(TokenProgram::SplToken.id()),
                kind: InstructionKind::Other,
            }],
            vec![],
            vec![],
        );
        assert!(extractor.extract(&tx).is_none());
    }

    #[test]
    fn test_native_balance_delta() {
        let extractor = TransferExtractor::for_asset(&Asset::Native, &recipient());
        let tx = record(vec![], vec![50_000_000, 1_000], vec![39_995_000, 10_001_000]);
        let found = extractor.extract(&tx).unwrap();
        assert_eq!(found.amount, 10_000_000);
        assert_eq!(found.source, payer());
        assert_eq!(found.destination, recipient());
    }

    #[test]
    fn test_native_without_gain_or_recipient() {
        let extractor = TransferExtractor::for_asset(&Asset::Native, &recipient());
        let unchanged = record(vec![], vec![10, 10], vec![5, 10]);
        assert!(extractor.extract(&unchanged).is_none());

        let stranger = TransferExtractor::Native {
            recipient: mint(),
        };
        let tx = record(vec![], vec![10, 0], vec![5, 5]);
        assert!(stranger.extract(&tx).is_none());
    }
}
