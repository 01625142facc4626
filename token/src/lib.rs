use std::collections::BTreeMap;

use log::debug;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use bor_keys::Address;
use bor_primitives::{coin::Coin, policy::Policy};

#[derive(Clone, Debug, Error, Eq, PartialEq)]
pub enum TokenError {
    #[error("Insufficient funds: needed {needed}, but has balance {balance}")]
    InsufficientFunds { needed: Coin, balance: Coin },
    #[error("Insufficient allowance: needed {needed}, but has allowance {allowance}")]
    InsufficientAllowance { needed: Coin, allowance: Coin },
    #[error("Only the minter may mint")]
    InvalidMinter,
    #[error("Token supply overflow")]
    SupplyOverflow,
}

/// The fungible staking token. Balances and allowances live in a single
/// in-memory ledger; the staking service moves stake exclusively through
/// pre-approved allowances, so depositors keep custody until they act.
///
/// The consensus layer itself (`Policy::SYSTEM_ADDRESS`) may always mint:
/// that is where checkpoint and single-validator rewards come from.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub struct TokenLedger {
    minter: Address,
    total_supply: Coin,
    balances: BTreeMap<Address, Coin>,
    allowances: BTreeMap<Address, BTreeMap<Address, Coin>>,
}

impl TokenLedger {
    pub fn new(minter: Address) -> Self {
        TokenLedger {
            minter,
            total_supply: Coin::ZERO,
            balances: BTreeMap::new(),
            allowances: BTreeMap::new(),
        }
    }

    pub fn minter(&self) -> &Address {
        &self.minter
    }

    pub fn total_supply(&self) -> Coin {
        self.total_supply
    }

    pub fn balance_of(&self, address: &Address) -> Coin {
        self.balances.get(address).copied().unwrap_or(Coin::ZERO)
    }

    pub fn allowance(&self, owner: &Address, spender: &Address) -> Coin {
        self.allowances
            .get(owner)
            .and_then(|spenders| spenders.get(spender))
            .copied()
            .unwrap_or(Coin::ZERO)
    }

    /// Creates new tokens on `to`'s balance. Restricted to the minter and
    /// the system address.
    pub fn mint(&mut self, caller: &Address, to: &Address, value: Coin) -> Result<(), TokenError> {
        if *caller != self.minter && *caller != Policy::SYSTEM_ADDRESS {
            return Err(TokenError::InvalidMinter);
        }

        let total_supply = self
            .total_supply
            .checked_add(value)
            .ok_or(TokenError::SupplyOverflow)?;

        // All checks passed, not allowed to fail from here on!

        self.total_supply = total_supply;
        self.credit(to, value);

        debug!("Minted {} to {}", value, to);

        Ok(())
    }

    /// Destroys tokens held by `from`.
    pub fn burn(&mut self, from: &Address, value: Coin) -> Result<(), TokenError> {
        self.debit(from, value)?;
        self.total_supply -= value;

        debug!("Burned {} from {}", value, from);

        Ok(())
    }

    pub fn transfer(
        &mut self,
        from: &Address,
        to: &Address,
        value: Coin,
    ) -> Result<(), TokenError> {
        self.debit(from, value)?;
        self.credit(to, value);
        Ok(())
    }

    /// Raises the allowance `owner` grants to `spender` by `value`.
    pub fn increase_allowance(
        &mut self,
        owner: &Address,
        spender: &Address,
        value: Coin,
    ) -> Result<(), TokenError> {
        let entry = self
            .allowances
            .entry(*owner)
            .or_default()
            .entry(*spender)
            .or_insert(Coin::ZERO);

        *entry = entry.checked_add(value).ok_or(TokenError::SupplyOverflow)?;

        Ok(())
    }

    /// Moves `value` from `from` to `to` on behalf of `spender`, consuming
    /// allowance. A `spender` equal to `from` spends its own balance
    /// without touching allowances.
    pub fn transfer_from(
        &mut self,
        spender: &Address,
        from: &Address,
        to: &Address,
        value: Coin,
    ) -> Result<(), TokenError> {
        if spender != from && !value.is_zero() {
            let allowance = self.allowance(from, spender);
            if allowance < value {
                return Err(TokenError::InsufficientAllowance {
                    needed: value,
                    allowance,
                });
            }

            let balance = self.balance_of(from);
            if balance < value {
                return Err(TokenError::InsufficientFunds {
                    needed: value,
                    balance,
                });
            }

            // All checks passed, not allowed to fail from here on!

            *self
                .allowances
                .get_mut(from)
                .and_then(|spenders| spenders.get_mut(spender))
                .expect("allowance was just read") -= value;
        }

        self.debit(from, value)?;
        self.credit(to, value);

        Ok(())
    }

    fn debit(&mut self, from: &Address, value: Coin) -> Result<(), TokenError> {
        let balance = self.balance_of(from);

        let remaining = balance
            .checked_sub(value)
            .ok_or(TokenError::InsufficientFunds {
                needed: value,
                balance,
            })?;

        if remaining.is_zero() {
            self.balances.remove(from);
        } else {
            self.balances.insert(*from, remaining);
        }

        Ok(())
    }

    fn credit(&mut self, to: &Address, value: Coin) {
        if value.is_zero() {
            return;
        }
        let entry = self.balances.entry(*to).or_insert(Coin::ZERO);
        *entry += value;
    }
}
