//! Known (standard) field sets per record type.

use std::collections::HashSet;

const VENDOR_FIELDS: &[&str] = &[
    "id",
    "entityId",
    "companyName",
    "legalName",
    "email",
    "phone",
    "fax",
    "url",
    "isInactive",
    "isPerson",
    "balance",
    "balancePrimary",
    "creditLimit",
    "unbilledOrders",
    "unbilledOrdersPrimary",
    "currency",
    "terms",
    "category",
    "subsidiary",
    "dateCreated",
    "lastModifiedDate",
    "taxIdNum",
    "taxRegistrationList",
    "accountNumber",
    "addressBook",
    "contactList",
    "currencyList",
    "subscriptionsList",
    "rolesList",
    "comments",
    "printOnCheckAs",
    "altName",
    "defaultAddress",
    "billPay",
    "eligibleForCommission",
    "emailPreference",
    "emailTransactions",
    "printTransactions",
    "faxTransactions",
    "representingSubsidiary",
    "workCalendar",
    "giveAccess",
    "sendEmail",
    "password",
    "requirePwdChange",
    "inheritIPRules",
    "globalSubscriptionStatus",
];

const VENDOR_BILL_FIELDS: &[&str] = &[
    "id",
    "tranId",
    "entity",
    "tranDate",
    "dueDate",
    "createdDate",
    "lastModifiedDate",
    "userTotal",
    "total",
    "amountRemaining",
    "exchangeRate",
    "currency",
    "status",
    "approvalStatus",
    "subsidiary",
    "memo",
    "tranStatus",
];

/// Names of the standard fields of one record type.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KnownFieldSet {
    fields: HashSet<String>,
}

impl KnownFieldSet {
    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn vendor() -> Self {
        Self::from_fields(VENDOR_FIELDS.iter().copied())
    }

    pub fn vendor_bill() -> Self {
        Self::from_fields(VENDOR_BILL_FIELDS.iter().copied())
    }

    /// Built-in set for a record type. Unknown types get an empty set, so
    /// every field is treated as custom.
    pub fn for_record_type(record_type: &str) -> Self {
        match record_type.to_ascii_lowercase().as_str() {
            "vendor" => Self::vendor(),
            "vendorbill" => Self::vendor_bill(),
            _ => Self::default(),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    pub fn insert(&mut self, field: impl Into<String>) -> bool {
        self.fields.insert(field.into())
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
