//! Role checks for instructions that target an existing agreement.

use escrowpay_types::{Address, EscrowError, InstructionKind, PaymentAgreement, Result, Role};

/// Resolve `signer`'s role and check it may issue `kind` against `record`.
///
/// | kind                              | allowed roles      |
/// |-----------------------------------|--------------------|
/// | `Approve`, `Cancel`               | payer, receiver    |
/// | `RefereeComplete`, `RefereeCancel`| configured referee |
/// | `WithdrawExpired`                 | payer              |
///
/// An agreement created without a referee rejects every referee
/// instruction.
///
/// # Errors
/// `Unauthorized` when the role does not match.
pub fn authorize(
    kind: InstructionKind,
    signer: Address,
    record: &PaymentAgreement,
) -> Result<Role> {
    let role = record.role_of(&signer);
    let allowed = match (kind, role) {
        (InstructionKind::Approve | InstructionKind::Cancel, Some(Role::Payer | Role::Receiver))
        | (
            InstructionKind::RefereeComplete | InstructionKind::RefereeCancel,
            Some(Role::Referee),
        )
        | (InstructionKind::WithdrawExpired, Some(Role::Payer)) => role,
        _ => None,
    };

    allowed.ok_or_else(|| {
        tracing::warn!(
            agreement = %record.id,
            signer = %signer,
            action = %kind,
            "Unauthorized instruction rejected"
        );
        EscrowError::Unauthorized {
            signer,
            action: kind,
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const PAYER: Address = Address([1; 32]);
    const RECEIVER: Address = Address([2; 32]);
    const REFEREE: Address = Address([3; 32]);
    const STRANGER: Address = Address([4; 32]);

    fn with_referee() -> PaymentAgreement {
        let mut r = PaymentAgreement::dummy(PAYER, RECEIVER, 10);
        r.referee = Some(REFEREE);
        r
    }

    #[test]
    fn parties_may_approve_and_cancel() {
        let r = with_referee();
        for kind in [InstructionKind::Approve, InstructionKind::Cancel] {
            assert_eq!(authorize(kind, PAYER, &r).unwrap(), Role::Payer);
            assert_eq!(authorize(kind, RECEIVER, &r).unwrap(), Role::Receiver);
            assert!(authorize(kind, REFEREE, &r).is_err());
            assert!(authorize(kind, STRANGER, &r).is_err());
        }
    }

    #[test]
    fn only_referee_intervenes() {
        let r = with_referee();
        for kind in [InstructionKind::RefereeComplete, InstructionKind::RefereeCancel] {
            assert_eq!(authorize(kind, REFEREE, &r).unwrap(), Role::Referee);
            for other in [PAYER, RECEIVER, STRANGER] {
                let err = authorize(kind, other, &r).unwrap_err();
                assert!(matches!(err, EscrowError::Unauthorized { action, .. } if action == kind));
            }
        }
    }

    #[test]
    fn no_referee_means_no_intervention() {
        let r = PaymentAgreement::dummy(PAYER, RECEIVER, 10);
        for signer in [PAYER, RECEIVER, STRANGER] {
            assert!(authorize(InstructionKind::RefereeComplete, signer, &r).is_err());
            assert!(authorize(InstructionKind::RefereeCancel, signer, &r).is_err());
        }
    }

    #[test]
    fn only_payer_withdraws() {
        let r = with_referee();
        assert_eq!(
            authorize(InstructionKind::WithdrawExpired, PAYER, &r).unwrap(),
            Role::Payer
        );
        for other in [RECEIVER, REFEREE, STRANGER] {
            assert!(authorize(InstructionKind::WithdrawExpired, other, &r).is_err());
        }
    }
}
