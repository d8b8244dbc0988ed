use sea_orm_migration::{prelude::*, schema::*, sea_orm::sea_query::extension::postgres::Type};

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_type(
                Type::create()
                    .as_enum(AccountRole::Enum)
                    .values([AccountRole::Rider, AccountRole::Driver])
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(Account::Table)
                    .if_not_exists()
                    .col(uuid(Account::Id).primary_key())
                    .col(string_len(Account::Name, 100).not_null())
                    .col(string_len(Account::Email, 255).not_null().unique_key())
                    .col(string_len(Account::PasswordHash, 255).not_null())
                    .col(string_len(Account::Phone, 32).not_null().default(""))
                    .col(
                        ColumnDef::new(Account::Role)
                            .custom(AccountRole::Enum)
                            .not_null(),
                    )
                    // Driver profile
                    .col(string_len_null(Account::VehicleType, 50))
                    .col(string_len_null(Account::VehicleNumber, 50))
                    .col(string_len_null(Account::LicenseNumber, 50))
                    .col(double_null(Account::LocationLat))
                    .col(double_null(Account::LocationLng))
                    .col(string_len_null(Account::LocationAddress, 255))
                    .col(boolean(Account::IsAvailable).not_null().default(true))
                    .col(double(Account::Rating).not_null().default(5.0))
                    .col(integer(Account::TotalRides).not_null().default(0))
                    .col(
                        timestamp_with_time_zone(Account::CreatedAt)
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(Account::Table).to_owned())
            .await?;

        manager
            .drop_type(Type::drop().name(AccountRole::Enum).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Account {
    Table,
    Id,
    Name,
    Email,
    PasswordHash,
    Phone,
    Role,
    VehicleType,
    VehicleNumber,
    LicenseNumber,
    LocationLat,
    LocationLng,
    LocationAddress,
    IsAvailable,
    Rating,
    TotalRides,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum AccountRole {
    #[sea_orm(iden = "account_role")]
    Enum,
    #[sea_orm(iden = "rider")]
    Rider,
    #[sea_orm(iden = "driver")]
    Driver,
}
