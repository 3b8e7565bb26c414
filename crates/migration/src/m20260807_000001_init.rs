//! Initial schema migration - creates all tables from scratch.
//!
//! It creates the complete schema for Splitbook:
//!
//! - `users`: authentication and the stable `user_id` every record points at
//! - `transactions`: income/expense ledger entries
//! - `recurring_rules`: monthly materialization templates
//! - `splits`: peer-to-peer debt shares, including mirrored copies
//! - `user_settings`: one record per user (owe limit, currency, import flag)

use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

// ─────────────────────────────────────────────────────────────────────────────
// Table identifiers
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Iden)]
enum Users {
    Table,
    Username,
    PasswordDigest,
    UserId,
    CreatedAt,
    LoginTime,
    Avatar,
}

#[derive(Iden)]
enum Transactions {
    Table,
    Id,
    UserId,
    Kind,
    Title,
    AmountMinor,
    Category,
    Date,
    Description,
    IsRecurring,
    CreatedAt,
    SplitGroupId,
}

#[derive(Iden)]
enum RecurringRules {
    Table,
    Id,
    UserId,
    Kind,
    Title,
    AmountMinor,
    Category,
    IncomeKind,
    Description,
    LastAdded,
}

#[derive(Iden)]
enum Splits {
    Table,
    Id,
    GroupId,
    UserId,
    Title,
    AmountMinor,
    Kind,
    CounterpartyName,
    CounterpartyId,
    Date,
    Description,
    IsMirrored,
}

#[derive(Iden)]
enum UserSettings {
    Table,
    UserId,
    OweLimitMinor,
    Currency,
    Migrated,
    UpdatedAt,
}

// ─────────────────────────────────────────────────────────────────────────────
// Migration implementation
// ─────────────────────────────────────────────────────────────────────────────

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // ───────────────────────────────────────────────────────────────────
        // 1. Users
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Users::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Users::Username)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Users::PasswordDigest).string().not_null())
                    .col(ColumnDef::new(Users::UserId).string().not_null())
                    .col(ColumnDef::new(Users::CreatedAt).timestamp().not_null())
                    .col(ColumnDef::new(Users::LoginTime).timestamp().not_null())
                    .col(ColumnDef::new(Users::Avatar).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-user_id-unique")
                    .table(Users::Table)
                    .col(Users::UserId)
                    .unique()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-users-login_time")
                    .table(Users::Table)
                    .col(Users::LoginTime)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 2. Transactions
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Transactions::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Transactions::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Transactions::UserId).string().not_null())
                    .col(ColumnDef::new(Transactions::Kind).string().not_null())
                    .col(ColumnDef::new(Transactions::Title).string().not_null())
                    .col(
                        ColumnDef::new(Transactions::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::Category).string().not_null())
                    .col(ColumnDef::new(Transactions::Date).date().not_null())
                    .col(ColumnDef::new(Transactions::Description).string())
                    .col(
                        ColumnDef::new(Transactions::IsRecurring)
                            .boolean()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Transactions::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Transactions::SplitGroupId).string())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-kind")
                    .table(Transactions::Table)
                    .col(Transactions::Kind)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-date")
                    .table(Transactions::Table)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-transactions-user_id-date")
                    .table(Transactions::Table)
                    .col(Transactions::UserId)
                    .col(Transactions::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 3. Recurring rules
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(RecurringRules::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(RecurringRules::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(RecurringRules::UserId).string().not_null())
                    .col(ColumnDef::new(RecurringRules::Kind).string().not_null())
                    .col(ColumnDef::new(RecurringRules::Title).string().not_null())
                    .col(
                        ColumnDef::new(RecurringRules::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(RecurringRules::Category).string())
                    .col(ColumnDef::new(RecurringRules::IncomeKind).string())
                    .col(ColumnDef::new(RecurringRules::Description).string())
                    .col(ColumnDef::new(RecurringRules::LastAdded).timestamp())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_rules-user_id")
                    .table(RecurringRules::Table)
                    .col(RecurringRules::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-recurring_rules-kind")
                    .table(RecurringRules::Table)
                    .col(RecurringRules::Kind)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 4. Splits
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(Splits::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(Splits::Id)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(Splits::GroupId).string().not_null())
                    .col(ColumnDef::new(Splits::UserId).string().not_null())
                    .col(ColumnDef::new(Splits::Title).string().not_null())
                    .col(
                        ColumnDef::new(Splits::AmountMinor)
                            .big_integer()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Splits::Kind).string().not_null())
                    .col(
                        ColumnDef::new(Splits::CounterpartyName)
                            .string()
                            .not_null(),
                    )
                    .col(ColumnDef::new(Splits::CounterpartyId).string().not_null())
                    .col(ColumnDef::new(Splits::Date).date().not_null())
                    .col(ColumnDef::new(Splits::Description).string())
                    .col(ColumnDef::new(Splits::IsMirrored).boolean().not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-splits-user_id")
                    .table(Splits::Table)
                    .col(Splits::UserId)
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-splits-date")
                    .table(Splits::Table)
                    .col(Splits::Date)
                    .to_owned(),
            )
            .await?;

        // ───────────────────────────────────────────────────────────────────
        // 5. User settings
        // ───────────────────────────────────────────────────────────────────
        manager
            .create_table(
                Table::create()
                    .table(UserSettings::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(UserSettings::UserId)
                            .string()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(UserSettings::OweLimitMinor).big_integer())
                    .col(ColumnDef::new(UserSettings::Currency).string())
                    .col(
                        ColumnDef::new(UserSettings::Migrated)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(ColumnDef::new(UserSettings::UpdatedAt).timestamp())
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(UserSettings::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Splits::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(RecurringRules::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Transactions::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Users::Table).to_owned())
            .await?;
        Ok(())
    }
}
