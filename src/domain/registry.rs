use std::collections::HashMap;

use super::{Account, AccountId, Amount, LedgerError, LogEntry};

/// Owner and lookup index for every account, keyed by unique identifier.
///
/// Each operation resolves the identifier first, so an unknown id is
/// reported before any account is touched.
#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    accounts: HashMap<AccountId, Account>,
}

impl AccountRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuild a registry from previously stored accounts.
    pub fn from_accounts(accounts: impl IntoIterator<Item = Account>) -> Result<Self, LedgerError> {
        let mut registry = Self::new();
        for account in accounts {
            registry.insert(account)?;
        }
        Ok(registry)
    }

    /// Open a new account under `id`.
    pub fn create_account(
        &mut self,
        id: impl Into<AccountId>,
        holder_name: impl Into<String>,
        opening_balance: Amount,
    ) -> Result<&Account, LedgerError> {
        let id = id.into();
        if self.accounts.contains_key(&id) {
            return Err(LedgerError::DuplicateAccount(id));
        }

        let account = Account::open(id.clone(), holder_name, opening_balance);
        Ok(self.accounts.entry(id).or_insert(account))
    }

    pub fn lookup(&self, id: &str) -> Result<&Account, LedgerError> {
        self.accounts
            .get(id)
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    fn lookup_mut(&mut self, id: &str) -> Result<&mut Account, LedgerError> {
        self.accounts
            .get_mut(id)
            .ok_or_else(|| LedgerError::AccountNotFound(id.to_string()))
    }

    pub fn contains(&self, id: &str) -> bool {
        self.accounts.contains_key(id)
    }

    pub fn deposit(&mut self, id: &str, amount: Amount) -> Result<&LogEntry, LedgerError> {
        self.lookup_mut(id)?.deposit(amount)
    }

    pub fn withdraw(&mut self, id: &str, amount: Amount) -> Result<&LogEntry, LedgerError> {
        self.lookup_mut(id)?.withdraw(amount)
    }

    pub fn balance(&self, id: &str) -> Result<Amount, LedgerError> {
        Ok(self.lookup(id)?.balance())
    }

    pub fn transaction_history(&self, id: &str) -> Result<Vec<String>, LedgerError> {
        Ok(self.lookup(id)?.transaction_history())
    }

    /// All accounts, ordered by id.
    pub fn accounts(&self) -> Vec<&Account> {
        let mut accounts: Vec<&Account> = self.accounts.values().collect();
        accounts.sort_by(|a, b| a.id().cmp(b.id()));
        accounts
    }

    pub fn len(&self) -> usize {
        self.accounts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty()
    }

    /// Add an already-built account, e.g. one restored from storage or a
    /// snapshot.
    pub(crate) fn insert(&mut self, account: Account) -> Result<&Account, LedgerError> {
        if self.accounts.contains_key(account.id()) {
            return Err(LedgerError::DuplicateAccount(account.id().to_string()));
        }
        Ok(self
            .accounts
            .entry(account.id().to_string())
            .or_insert(account))
    }

    /// Put back a prior copy of an existing account, undoing a mutation
    /// that could not be persisted.
    pub(crate) fn restore(&mut self, account: Account) {
        self.accounts.insert(account.id().to_string(), account);
    }

    /// Drop an account that was created but could not be persisted.
    pub(crate) fn discard(&mut self, id: &str) {
        self.accounts.remove(id);
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn registry() -> AccountRegistry {
        let mut registry = AccountRegistry::new();
        registry
            .create_account("1001", "Parth Bishnoi", dec!(1000))
            .unwrap();
        registry
    }

    #[test]
    fn test_create_and_lookup() {
        let registry = registry();
        let account = registry.lookup("1001").unwrap();
        assert_eq!(account.id(), "1001");
        assert_eq!(account.holder_name(), "Parth Bishnoi");
        assert_eq!(account.balance(), dec!(1000));
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("1001"));
    }

    #[test]
    fn test_duplicate_account_leaves_first_untouched() {
        let mut registry = registry();
        registry.deposit("1001", dec!(50)).unwrap();

        let result = registry.create_account("1001", "Someone Else", dec!(5));
        assert_eq!(
            result.map(|a| a.id().to_string()),
            Err(LedgerError::DuplicateAccount("1001".into()))
        );

        let account = registry.lookup("1001").unwrap();
        assert_eq!(account.holder_name(), "Parth Bishnoi");
        assert_eq!(account.balance(), dec!(1050));
        assert_eq!(account.entries().len(), 2);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_unknown_account() {
        let mut registry = registry();
        let missing = LedgerError::AccountNotFound("9999".into());

        assert_eq!(registry.lookup("9999").err(), Some(missing.clone()));
        assert_eq!(registry.deposit("9999", dec!(1)).err(), Some(missing.clone()));
        assert_eq!(registry.withdraw("9999", dec!(1)).err(), Some(missing.clone()));
        assert_eq!(registry.balance("9999"), Err(missing.clone()));
        assert_eq!(registry.transaction_history("9999"), Err(missing));
    }

    #[test]
    fn test_unknown_account_checked_before_amount() {
        let mut registry = registry();
        assert_eq!(
            registry.deposit("9999", dec!(-5)).err(),
            Some(LedgerError::AccountNotFound("9999".into()))
        );
    }

    #[test]
    fn test_account_errors_propagate_unchanged() {
        let mut registry = registry();
        assert_eq!(
            registry.deposit("1001", dec!(0)).err(),
            Some(LedgerError::InvalidAmount(dec!(0)))
        );
        assert_eq!(
            registry.withdraw("1001", dec!(5000)).err(),
            Some(LedgerError::InsufficientFunds {
                balance: dec!(1000),
                requested: dec!(5000),
            })
        );
    }

    #[test]
    fn test_accounts_ordered_by_id() {
        let mut registry = registry();
        registry.create_account("0500", "B", dec!(0)).unwrap();
        registry.create_account("2000", "C", dec!(0)).unwrap();

        let ids: Vec<&str> = registry.accounts().iter().map(|a| a.id()).collect();
        assert_eq!(ids, vec!["0500", "1001", "2000"]);
    }

    #[test]
    fn test_from_accounts_rejects_duplicates() {
        let accounts = vec![
            Account::open("a", "A", dec!(1)),
            Account::open("a", "A again", dec!(2)),
        ];
        assert_eq!(
            AccountRegistry::from_accounts(accounts).err().map(|e| e.to_string()),
            Some("Account already exists: a".to_string())
        );
    }

    #[test]
    fn test_restore_undoes_mutation() {
        let mut registry = registry();
        let before = registry.lookup("1001").unwrap().clone();

        registry.deposit("1001", dec!(10)).unwrap();
        registry.restore(before.clone());

        assert_eq!(registry.lookup("1001").unwrap(), &before);
    }

    #[test]
    fn test_discard_removes_account() {
        let mut registry = registry();
        registry.discard("1001");
        assert!(registry.is_empty());
    }
}
