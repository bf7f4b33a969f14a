use std::{
    collections::HashMap,
    sync::{Arc, Mutex, RwLock},
};

use proxysend_server::{EntityMetadata, PropertyLeaf};
use proxysend_shared::{EntityIndex, EntityState, PropValue, SendProp, SendPropType, SendTable};

use super::test_proxies::TestProxies;

pub const TEST_TABLE: &str = "DT_TestEntity";

/// Byte offset of the first property in an entity's state
const BASE_OFFSET: usize = 0x10;

/// Current property values of one test entity
pub struct TestEntityState {
    values: RwLock<HashMap<String, Vec<PropValue>>>,
}

impl TestEntityState {
    fn new(table: &SendTable) -> Self {
        let values = table
            .props()
            .iter()
            .filter_map(|prop| {
                let value = match prop.prop_type() {
                    SendPropType::Int => PropValue::Int(0),
                    SendPropType::Float => PropValue::Float(0.0),
                    SendPropType::Vector | SendPropType::VectorXY => PropValue::Vector([0.0; 3]),
                    SendPropType::String => PropValue::String(String::new()),
                    SendPropType::Array | SendPropType::DataTable => return None,
                };
                Some((prop.name().to_string(), vec![value; prop.elements()]))
            })
            .collect();
        Self {
            values: RwLock::new(values),
        }
    }

    pub fn set(&self, name: &str, element: usize, value: PropValue) {
        let mut values = self.values.write().unwrap();
        let elements = values.get_mut(name).expect("unknown property");
        elements[element] = value;
    }

    /// Forgets a value so encoding the entity fails
    pub fn unset(&self, name: &str) {
        self.values.write().unwrap().remove(name);
    }
}

impl EntityState for TestEntityState {
    fn read(&self, prop: &SendProp, element: usize) -> Option<PropValue> {
        let values = self.values.read().ok()?;
        values.get(prop.name())?.get(element).cloned()
    }
}

/// In-memory host: one entity class, its entities, and a log of every
/// state-changed mark
pub struct TestHost {
    proxies: TestProxies,
    table: SendTable,
    entities: RwLock<HashMap<EntityIndex, Arc<TestEntityState>>>,
    changed: Mutex<Vec<(EntityIndex, usize)>>,
}

impl TestHost {
    pub fn new() -> Self {
        let proxies = TestProxies::new();
        let props = vec![
            SendProp::new("m_iHealth", SendPropType::Int, proxies.identity.clone()),
            SendProp::new("m_iArmor", SendPropType::Int, proxies.uint8_to_int32.clone())
                .with_bits(8)
                .with_unsigned(true),
            SendProp::new("m_flSpeed", SendPropType::Float, proxies.identity.clone()),
            SendProp::new("m_vecOrigin", SendPropType::Vector, proxies.identity.clone()),
            SendProp::new("m_angRotation", SendPropType::Vector, proxies.identity.clone())
                .with_range(0.0, 360.0),
            SendProp::new("m_iszName", SendPropType::String, proxies.identity.clone()),
            SendProp::new("m_iAmmo", SendPropType::Int, proxies.uint16_to_int32.clone())
                .with_bits(16)
                .with_unsigned(true)
                .with_elements(4),
            SendProp::new("m_hOwner", SendPropType::Int, proxies.ehandle_to_int.clone())
                .with_bits(21)
                .with_unsigned(true),
            SendProp::new("m_nSkin", SendPropType::Int, proxies.custom_int8.clone()).with_bits(10),
            SendProp::new("m_Collision", SendPropType::DataTable, proxies.identity.clone()),
        ];
        let table = SendTable::new(TEST_TABLE, props.into_iter().map(Arc::new).collect());

        Self {
            proxies,
            table,
            entities: RwLock::new(HashMap::new()),
            changed: Mutex::new(Vec::new()),
        }
    }

    pub fn proxies(&self) -> &TestProxies {
        &self.proxies
    }

    pub fn table(&self) -> &SendTable {
        &self.table
    }

    pub fn prop(&self, name: &str) -> Arc<SendProp> {
        self.table.find(name).expect("unknown property").clone()
    }

    pub fn spawn(&self, entity: EntityIndex) -> Arc<TestEntityState> {
        let state = Arc::new(TestEntityState::new(&self.table));
        self.entities
            .write()
            .unwrap()
            .insert(entity, state.clone());
        state
    }

    pub fn despawn(&self, entity: EntityIndex) {
        self.entities.write().unwrap().remove(&entity);
    }

    pub fn state(&self, entity: EntityIndex) -> Arc<TestEntityState> {
        self.entities
            .read()
            .unwrap()
            .get(&entity)
            .expect("entity not spawned")
            .clone()
    }

    pub fn set(&self, entity: EntityIndex, name: &str, value: PropValue) {
        self.state(entity).set(name, 0, value);
    }

    pub fn offset_of(&self, name: &str, element: usize) -> usize {
        let index = self.table.flat_index(name, element).expect("unknown property");
        BASE_OFFSET + index * 4
    }

    pub fn changed_marks(&self) -> Vec<(EntityIndex, usize)> {
        self.changed.lock().unwrap().clone()
    }

    pub fn clear_changed_marks(&self) {
        self.changed.lock().unwrap().clear();
    }
}

impl Default for TestHost {
    fn default() -> Self {
        Self::new()
    }
}

impl EntityMetadata for TestHost {
    fn entity_exists(&self, entity: EntityIndex) -> bool {
        self.entities.read().unwrap().contains_key(&entity)
    }

    fn resolve(&self, _entity: EntityIndex, property: &str) -> Option<Vec<PropertyLeaf>> {
        let prop = self.table.find(property)?;
        let leaves = (0..prop.elements())
            .map(|element| PropertyLeaf {
                prop: prop.clone(),
                table: TEST_TABLE.to_string(),
                element,
                offset: self.offset_of(property, element),
            })
            .collect();
        Some(leaves)
    }

    fn mark_state_changed(&self, entity: EntityIndex, offset: usize) {
        self.changed.lock().unwrap().push((entity, offset));
    }
}
