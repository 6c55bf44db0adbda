use sea_orm_migration::prelude::*;

mod m20260127_add_users;
mod m20260205_add_verification_tokens;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260127_add_users::Migration),
            Box::new(m20260205_add_verification_tokens::Migration),
        ]
    }
}
