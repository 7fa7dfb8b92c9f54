//! Instruction model: the six operations the program accepts.
//!
//! Every instruction except `CreateAgreement` targets an existing record
//! through an [`AgreementRef`], the same (payer, name) seeds the id was
//! derived from. A [`SignedInstruction`] binds an instruction to its
//! signer with an ed25519 signature over a canonical payload.

use std::fmt;

use ed25519_dalek::{Signature, Signer, SigningKey};
use serde::{Deserialize, Serialize};

use crate::{Address, AgreementId, EscrowError, ProgramId, Result, Timestamp, constants};

/// Inputs to `CreateAgreement`. The signer becomes the payer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AgreementTerms {
    pub name: String,
    pub receiver: Address,
    pub amount: u64,
    pub referee: Option<Address>,
    pub expiration: Option<Timestamp>,
}

/// Seeds locating an existing agreement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AgreementRef {
    pub payer: Address,
    pub name: String,
}

impl AgreementRef {
    #[must_use]
    pub fn new(payer: Address, name: impl Into<String>) -> Self {
        Self {
            payer,
            name: name.into(),
        }
    }

    #[must_use]
    pub fn id(&self, program_id: &ProgramId) -> AgreementId {
        AgreementId::derive(program_id, &self.payer, &self.name)
    }
}

/// Discriminant of an [`Instruction`], used in logs and errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InstructionKind {
    CreateAgreement,
    Approve,
    Cancel,
    RefereeComplete,
    RefereeCancel,
    WithdrawExpired,
}

impl InstructionKind {
    fn tag(self) -> u8 {
        match self {
            Self::CreateAgreement => 0,
            Self::Approve => 1,
            Self::Cancel => 2,
            Self::RefereeComplete => 3,
            Self::RefereeCancel => 4,
            Self::WithdrawExpired => 5,
        }
    }
}

impl fmt::Display for InstructionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateAgreement => write!(f, "CREATE_AGREEMENT"),
            Self::Approve => write!(f, "APPROVE"),
            Self::Cancel => write!(f, "CANCEL"),
            Self::RefereeComplete => write!(f, "REFEREE_COMPLETE"),
            Self::RefereeCancel => write!(f, "REFEREE_CANCEL"),
            Self::WithdrawExpired => write!(f, "WITHDRAW_EXPIRED"),
        }
    }
}

/// An unsigned instruction payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Instruction {
    CreateAgreement(AgreementTerms),
    Approve(AgreementRef),
    Cancel(AgreementRef),
    RefereeComplete(AgreementRef),
    RefereeCancel(AgreementRef),
    WithdrawExpired(AgreementRef),
}

impl Instruction {
    #[must_use]
    pub fn kind(&self) -> InstructionKind {
        match self {
            Self::CreateAgreement(_) => InstructionKind::CreateAgreement,
            Self::Approve(_) => InstructionKind::Approve,
            Self::Cancel(_) => InstructionKind::Cancel,
            Self::RefereeComplete(_) => InstructionKind::RefereeComplete,
            Self::RefereeCancel(_) => InstructionKind::RefereeCancel,
            Self::WithdrawExpired(_) => InstructionKind::WithdrawExpired,
        }
    }

    /// Canonical signing payload.
    ///
    /// Format: `"escrowpay:instruction:v1:" || program_id || signer || nonce(8)
    /// || kind(1) || fields`, with every variable-length field length-prefixed.
    #[must_use]
    pub fn signing_payload(&self, program_id: &ProgramId, signer: &Address, nonce: u64) -> Vec<u8> {
        let mut payload = Vec::with_capacity(256);
        payload.extend_from_slice(constants::INSTRUCTION_DOMAIN);
        payload.extend_from_slice(program_id.as_bytes());
        payload.extend_from_slice(signer.as_bytes());
        payload.extend_from_slice(&nonce.to_le_bytes());
        payload.push(self.kind().tag());
        match self {
            Self::CreateAgreement(terms) => {
                put_bytes(&mut payload, terms.name.as_bytes());
                payload.extend_from_slice(terms.receiver.as_bytes());
                payload.extend_from_slice(&terms.amount.to_le_bytes());
                match &terms.referee {
                    Some(referee) => {
                        payload.push(1);
                        payload.extend_from_slice(referee.as_bytes());
                    }
                    None => payload.push(0),
                }
                match terms.expiration {
                    Some(expiration) => {
                        payload.push(1);
                        payload.extend_from_slice(&expiration.as_secs().to_le_bytes());
                    }
                    None => payload.push(0),
                }
            }
            Self::Approve(target)
            | Self::Cancel(target)
            | Self::RefereeComplete(target)
            | Self::RefereeCancel(target)
            | Self::WithdrawExpired(target) => {
                payload.extend_from_slice(target.payer.as_bytes());
                put_bytes(&mut payload, target.name.as_bytes());
            }
        }
        payload
    }
}

fn put_bytes(out: &mut Vec<u8>, bytes: &[u8]) {
    out.extend_from_slice(&u32::try_from(bytes.len()).unwrap_or(u32::MAX).to_le_bytes());
    out.extend_from_slice(bytes);
}

/// An instruction together with its signer's ed25519 signature.
///
/// `nonce` is chosen by the signer and may be used once per signer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SignedInstruction {
    pub signer: Address,
    pub nonce: u64,
    pub instruction: Instruction,
    /// Ed25519 signature over [`Instruction::signing_payload`].
    pub signature: Vec<u8>,
}

impl SignedInstruction {
    /// Sign `instruction` with `key`. The signer address is the key's public half.
    #[must_use]
    pub fn sign(
        key: &SigningKey,
        program_id: &ProgramId,
        nonce: u64,
        instruction: Instruction,
    ) -> Self {
        let signer = Address::from(&key.verifying_key());
        let payload = instruction.signing_payload(program_id, &signer, nonce);
        let signature = key.sign(&payload).to_bytes().to_vec();
        Self {
            signer,
            nonce,
            instruction,
            signature,
        }
    }

    /// Verify the signature against `signer` for this program.
    ///
    /// # Errors
    /// Returns `InvalidSignature` if the key, the signature encoding, or
    /// the signature itself is invalid.
    pub fn verify(&self, program_id: &ProgramId) -> Result<()> {
        let key = self.signer.verifying_key()?;
        let signature =
            Signature::from_slice(&self.signature).map_err(|e| EscrowError::InvalidSignature {
                reason: format!("malformed signature: {e}"),
            })?;
        let payload = self
            .instruction
            .signing_payload(program_id, &self.signer, self.nonce);
        key.verify_strict(&payload, &signature)
            .map_err(|e| EscrowError::InvalidSignature {
                reason: format!("{} from {}: {e}", self.instruction.kind(), self.signer),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(seed: u8) -> SigningKey {
        SigningKey::from_bytes(&[seed; 32])
    }

    fn approve(payer: Address) -> Instruction {
        Instruction::Approve(AgreementRef::new(payer, "p1"))
    }

    #[test]
    fn kind_display() {
        assert_eq!(format!("{}", InstructionKind::WithdrawExpired), "WITHDRAW_EXPIRED");
        assert_eq!(approve(Address([1; 32])).kind(), InstructionKind::Approve);
    }

    #[test]
    fn agreement_ref_matches_derivation() {
        let program = ProgramId::default();
        let payer = Address([1; 32]);
        let target = AgreementRef::new(payer, "p1");
        assert_eq!(target.id(&program), AgreementId::derive(&program, &payer, "p1"));
    }

    #[test]
    fn payload_differs_by_kind_and_nonce() {
        let program = ProgramId::default();
        let signer = Address([1; 32]);
        let target = AgreementRef::new(signer, "p1");
        let a = Instruction::Approve(target.clone()).signing_payload(&program, &signer, 1);
        let c = Instruction::Cancel(target.clone()).signing_payload(&program, &signer, 1);
        let a2 = Instruction::Approve(target).signing_payload(&program, &signer, 2);
        assert_ne!(a, c);
        assert_ne!(a, a2);
    }

    #[test]
    fn sign_then_verify() {
        let program = ProgramId::default();
        let k = key(7);
        let signed = SignedInstruction::sign(&k, &program, 1, approve(Address([1; 32])));
        assert_eq!(signed.signer, Address::from(&k.verifying_key()));
        signed.verify(&program).unwrap();
    }

    #[test]
    fn tampered_instruction_fails() {
        let program = ProgramId::default();
        let mut signed = SignedInstruction::sign(&key(7), &program, 1, approve(Address([1; 32])));
        signed.instruction = Instruction::Cancel(AgreementRef::new(Address([1; 32]), "p1"));
        let err = signed.verify(&program).unwrap_err();
        assert!(matches!(err, EscrowError::InvalidSignature { .. }));
    }

    #[test]
    fn wrong_program_fails() {
        let signed =
            SignedInstruction::sign(&key(7), &ProgramId::default(), 1, approve(Address([1; 32])));
        assert!(signed.verify(&ProgramId::from_label("other")).is_err());
    }

    #[test]
    fn forged_signer_fails() {
        let program = ProgramId::default();
        let mut signed = SignedInstruction::sign(&key(7), &program, 1, approve(Address([1; 32])));
        signed.signer = Address::from(&key(8).verifying_key());
        assert!(signed.verify(&program).is_err());
    }

    #[test]
    fn truncated_signature_fails() {
        let program = ProgramId::default();
        let mut signed = SignedInstruction::sign(&key(7), &program, 1, approve(Address([1; 32])));
        signed.signature.truncate(10);
        let err = signed.verify(&program).unwrap_err();
        assert!(format!("{err}").contains("malformed"));
    }

    #[test]
    fn serde_tagged_representation() {
        let ix = Instruction::CreateAgreement(AgreementTerms {
            name: "p1".into(),
            receiver: Address([2; 32]),
            amount: 5,
            referee: None,
            expiration: Some(Timestamp::new(10)),
        });
        let json = serde_json::to_string(&ix).unwrap();
        assert!(json.contains("\"type\":\"create_agreement\""));
        let back: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(ix, back);
    }
}
