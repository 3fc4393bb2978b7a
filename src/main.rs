#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tahfidz_docs_server::run().await
}
