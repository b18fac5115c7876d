use cucumber::given;

use crate::{cucumber::DeliveryWorld, support::fixtures::TestSystem};

#[given("a fresh install")]
async fn fresh_database(world: &mut DeliveryWorld) {
    let system = TestSystem::new().await;
    world.system = Some(system);
}
