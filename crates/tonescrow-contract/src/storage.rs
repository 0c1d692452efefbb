//! Persisted storage layout of an escrow instance.
//!
//! ```text
//! before construction:  initialized:1=0  finished:1=0  salt:256
//! after construction:   initialized:1=1  finished:1    ref(roles)
//!                       wallet:address-or-none  amount:coins  amount_interest:coins  salt:256
//! ```

use tonescrow_types::{
    Agreement, AssetMode, Cell, CellBuilder, EscrowError, EscrowState, Result, Roles, Salt, Stage,
};

/// Deployment data for a fresh instance.
pub fn initial_data(salt: Salt) -> Result<Cell> {
    store(&EscrowState::uninitialized(salt))
}

/// Decode the persisted record.
///
/// # Errors
/// - `InvalidPayload` for `finished` without `initialized`
/// - codec errors for a truncated record
pub fn load(cell: &Cell) -> Result<EscrowState> {
    let mut s = cell.parse();
    let initialized = s.load_bit()?;
    let finished = s.load_bit()?;

    if !initialized {
        if finished {
            return Err(EscrowError::InvalidPayload {
                reason: "finished flag set on an unconstructed record".into(),
            });
        }
        let salt = Salt(s.load_bytes::<32>()?);
        return Ok(EscrowState::uninitialized(salt));
    }

    let roles = Roles::from_cell(s.load_ref()?)?;
    let asset = AssetMode::from(s.load_address()?);
    let amount = s.load_coins()?;
    let amount_interest = s.load_coins()?;
    let salt = Salt(s.load_bytes::<32>()?);

    let agreement = Agreement {
        roles,
        asset,
        amount,
        amount_interest,
    };
    let stage = if finished {
        Stage::Finished(agreement)
    } else {
        Stage::Active(agreement)
    };
    Ok(EscrowState { salt, stage })
}

/// Encode the persisted record.
pub fn store(state: &EscrowState) -> Result<Cell> {
    let mut b = CellBuilder::new();
    b.store_bit(state.is_initialized())?;
    b.store_bit(state.is_finished())?;
    if let Some(a) = state.agreement() {
        b.store_ref(a.roles.to_cell()?)?;
        b.store_address(a.asset.wallet().as_ref())?;
        b.store_coins(a.amount)?;
        b.store_coins(a.amount_interest)?;
    }
    b.store_bytes(&state.salt.0)?;
    Ok(b.build())
}
