use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Payment methods are created by admins and picked by users
        manager
            .create_table(
                Table::create()
                    .table("payment_methods")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("title").string_len(100).not_null())
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table("users")
                    .if_not_exists()
                    .col(
                        ColumnDef::new("id")
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new("email").string().not_null().unique_key())
                    .col(ColumnDef::new("username").string().not_null())
                    .col(
                        ColumnDef::new("is_staff")
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new("is_active")
                            .boolean()
                            .not_null()
                            .default(true),
                    )
                    .col(ColumnDef::new("balance").double().not_null().default(0.0))
                    .col(ColumnDef::new("default_method_id").integer())
                    .col(ColumnDef::new("api_token_hash").string().unique_key())
                    .col(ColumnDef::new("date_joined").timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_users_default_method_id")
                            .from("users", "default_method_id")
                            .to("payment_methods", "id")
                            .on_delete(ForeignKeyAction::SetNull),
                    )
                    .to_owned(),
            )
            .await?;

        // Payment methods a user has used
        manager
            .create_table(
                Table::create()
                    .table("user_payment_methods")
                    .if_not_exists()
                    .col(ColumnDef::new("user_id").integer().not_null())
                    .col(ColumnDef::new("payment_method_id").integer().not_null())
                    .primary_key(Index::create().col("user_id").col("payment_method_id"))
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_payment_methods_user_id")
                            .from("user_payment_methods", "user_id")
                            .to("users", "id")
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_user_payment_methods_payment_method_id")
                            .from("user_payment_methods", "payment_method_id")
                            .to("payment_methods", "id")
                            .on_delete(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await?;

        Ok(())
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table("user_payment_methods").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table("users").to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table("payment_methods").to_owned())
            .await?;

        Ok(())
    }
}
