/// Tests for private-buffer substitution during transmission, and for the
/// listener notifications around it.

use std::sync::{Arc, Mutex};

use proxysend_server::{
    ClientInfo, ClientKind, FrameSnapshot, PackListener, PackedEntitySource, ProxySend,
    ProxySendConfig,
};
use proxysend_shared::{CallbackId, ClientSlot, EntityIndex, PluginId, PropValue};
use proxysend_test::{add_for_client, assert_encoded, pack_entities, TestEncoder, TestHost, TestPackedStore};

fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

#[derive(Debug, PartialEq, Eq)]
enum Event {
    PrePack(EntityIndex),
    PreWrite(ClientSlot),
    PostWrite(ClientSlot),
}

#[derive(Default)]
struct Recorder {
    events: Mutex<Vec<Event>>,
}

impl PackListener for Recorder {
    fn on_pre_pack_entity(&self, entity: EntityIndex) {
        self.events.lock().unwrap().push(Event::PrePack(entity));
    }

    fn on_pre_write_deltas(&self, slot: ClientSlot) {
        self.events.lock().unwrap().push(Event::PreWrite(slot));
    }

    fn on_post_write_deltas(&self, slot: ClientSlot) {
        self.events.lock().unwrap().push(Event::PostWrite(slot));
    }
}

struct NoParallel;

impl PackListener for NoParallel {
    fn is_parallel_pack_allowed(&self) -> bool {
        false
    }
}

/// Packs snapshot 1 (health 50) and snapshot 2 (health 70 plus 10 for
/// client 2) with entity 9 unhooked, leaving snapshot 2 ready to transmit
fn packed_service(
    host: &TestHost,
    store: &Arc<TestPackedStore>,
) -> (ProxySend, FrameSnapshot, FrameSnapshot) {
    host.spawn(5);
    host.spawn(9);
    host.set(5, "m_iHealth", PropValue::Int(50));

    let mut proxysend = ProxySend::new(ProxySendConfig::default(), host.proxies().standard());
    let encoder = proxysend.intercept(TestEncoder::new());
    let clients = [
        ClientInfo::ready(0, ClientKind::Human),
        ClientInfo::ready(1, ClientKind::Human),
    ];

    let first = FrameSnapshot::new(1, vec![5, 9]);
    proxysend
        .compute_client_packs(&clients, &first, host, || {
            pack_entities(&encoder, host, store, &first, None).map(|_| ())
        })
        .unwrap();
    proxysend.send_client_messages(|_| ());

    proxysend
        .hook(host, 5, "m_iHealth", add_for_client(CallbackId::new(PluginId(1), 1), 2, 10))
        .unwrap();
    host.set(5, "m_iHealth", PropValue::Int(70));

    let second = FrameSnapshot::new(2, vec![5, 9]);
    proxysend
        .compute_client_packs(&clients, &second, host, || {
            pack_entities(&encoder, host, store, &second, Some(1)).map(|_| ())
        })
        .unwrap();

    (proxysend, first, second)
}

#[test]
fn substitution_requires_the_packed_snapshot() {
    init_logger();

    let host = TestHost::new();
    let store = Arc::new(TestPackedStore::new());
    let (mut proxysend, first, second) = packed_service(&host, &store);
    let supply = proxysend.buffer_supply(store.clone());

    let (old, current) = proxysend.send_client_messages(|writer| {
        writer.write_for(1, || {
            (
                supply.packed_entity(&first, 5).unwrap(),
                supply.packed_entity(&second, 5).unwrap(),
            )
        })
    });

    assert_encoded!(host, &old.bits(), "m_iHealth", 0, PropValue::Int(50));
    assert_encoded!(host, &current.bits(), "m_iHealth", 0, PropValue::Int(80));
}

#[test]
fn fetches_outside_delta_writing_are_authoritative() {
    init_logger();

    let host = TestHost::new();
    let store = Arc::new(TestPackedStore::new());
    let (mut proxysend, _, second) = packed_service(&host, &store);
    let supply = proxysend.buffer_supply(store.clone());

    let outside = proxysend.send_client_messages(|_| supply.packed_entity(&second, 5).unwrap());
    assert_encoded!(host, &outside.bits(), "m_iHealth", 0, PropValue::Int(70));
}

#[test]
fn unhooked_entities_are_authoritative() {
    init_logger();

    let host = TestHost::new();
    let store = Arc::new(TestPackedStore::new());
    let (mut proxysend, _, second) = packed_service(&host, &store);
    let supply = proxysend.buffer_supply(store.clone());

    let packed = proxysend.send_client_messages(|writer| {
        writer.write_for(1, || supply.packed_entity(&second, 9).unwrap())
    });
    assert_eq!(packed.bits(), store.get(2, 9).unwrap());
}

#[test]
fn clients_without_buffers_are_authoritative() {
    init_logger();

    let host = TestHost::new();
    let store = Arc::new(TestPackedStore::new());
    let (mut proxysend, _, second) = packed_service(&host, &store);
    let supply = proxysend.buffer_supply(store.clone());

    // slot 4 connected after the packs were computed
    let packed = proxysend.send_client_messages(|writer| {
        writer.write_for(4, || supply.packed_entity(&second, 5).unwrap())
    });
    assert_encoded!(host, &packed.bits(), "m_iHealth", 0, PropValue::Int(70));
}

#[test]
fn buffers_are_gone_after_transmission() {
    init_logger();

    let host = TestHost::new();
    let store = Arc::new(TestPackedStore::new());
    let (mut proxysend, _, second) = packed_service(&host, &store);
    let supply = proxysend.buffer_supply(store.clone());

    proxysend.send_client_messages(|_| ());
    let packed = proxysend.send_client_messages(|writer| {
        writer.write_for(1, || supply.packed_entity(&second, 5).unwrap())
    });
    assert_encoded!(host, &packed.bits(), "m_iHealth", 0, PropValue::Int(70));
}

#[test]
fn listeners_see_packing_and_delta_writes() {
    init_logger();

    let host = TestHost::new();
    host.spawn(5);
    let store = TestPackedStore::new();

    let mut proxysend = ProxySend::new(ProxySendConfig::default(), host.proxies().standard());
    let recorder = Arc::new(Recorder::default());
    let listener: Arc<dyn PackListener> = recorder.clone();
    assert!(proxysend.add_listener(listener.clone()));
    assert!(!proxysend.add_listener(listener.clone()));

    let encoder = proxysend.intercept(TestEncoder::new());
    proxysend
        .hook(&host, 5, "m_iHealth", add_for_client(CallbackId::new(PluginId(1), 1), 1, 1))
        .unwrap();

    let snapshot = FrameSnapshot::new(1, vec![5]);
    proxysend
        .compute_client_packs(&[ClientInfo::ready(3, ClientKind::Human)], &snapshot, &host, || {
            pack_entities(&encoder, &host, &store, &snapshot, None).map(|_| ())
        })
        .unwrap();
    proxysend.send_client_messages(|writer| writer.write_for(3, || ()));

    assert_eq!(
        *recorder.events.lock().unwrap(),
        vec![Event::PrePack(5), Event::PreWrite(3), Event::PostWrite(3)]
    );

    assert!(proxysend.remove_listener(&listener));
    assert!(!proxysend.remove_listener(&listener));
}

#[test]
fn parallel_packing_needs_config_no_overrides_and_consent() {
    init_logger();

    let host = TestHost::new();
    host.spawn(5);

    let strict = ProxySend::new(ProxySendConfig::default(), host.proxies().standard());
    assert!(!strict.parallel_packing_allowed());

    let config = ProxySendConfig {
        allow_parallel_packing: true,
        ..Default::default()
    };
    let mut proxysend = ProxySend::new(config, host.proxies().standard());
    assert!(proxysend.parallel_packing_allowed());

    let veto: Arc<dyn PackListener> = Arc::new(NoParallel);
    proxysend.add_listener(veto.clone());
    assert!(!proxysend.parallel_packing_allowed());
    proxysend.remove_listener(&veto);

    let id = CallbackId::new(PluginId(1), 1);
    proxysend
        .hook(&host, 5, "m_iHealth", add_for_client(id, 1, 1))
        .unwrap();
    assert!(!proxysend.parallel_packing_allowed());

    proxysend.unhook(&host, 5, "m_iHealth", id).unwrap();
    assert!(proxysend.parallel_packing_allowed());
}
