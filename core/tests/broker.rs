#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;

use dynattach_core::Broker;
use dynattach_core::CallerId;
use dynattach_core::Capability;
use dynattach_core::CapabilityError;
use dynattach_core::CapabilityHandle;
use dynattach_core::Error;
use dynattach_core::FixedResolver;
use dynattach_core::Installer;
use dynattach_core::ModuleEdits;
use dynattach_core::Receiver;
use pretty_assertions::assert_eq;

struct FakeCapability;

impl Capability for FakeCapability {
    fn object_footprint(&self, unit: &str) -> Result<u64, CapabilityError> {
        match unit {
            "missing" => Err(CapabilityError::UnitNotFound(unit.to_string())),
            _ => Ok(64),
        }
    }

    fn loaded_units(&self) -> Vec<String> {
        vec!["alpha".to_string(), "beta".to_string()]
    }

    fn is_redefinable(&self, unit: &str) -> Result<bool, CapabilityError> {
        Ok(unit != "locked")
    }

    fn redefine_unit(&self, unit: &str, _code: &[u8]) -> Result<(), CapabilityError> {
        if unit == "locked" {
            return Err(CapabilityError::UnitNotModifiable(unit.to_string()));
        }
        Ok(())
    }

    fn supports_redefine(&self) -> bool {
        true
    }

    fn supports_retransform(&self) -> bool {
        true
    }

    fn supports_call_prefix(&self) -> bool {
        false
    }

    fn is_adjustable_module(&self, _module: &str) -> Result<bool, CapabilityError> {
        Ok(true)
    }

    fn adjust_module_visibility(
        &self,
        _module: &str,
        _edits: &ModuleEdits,
    ) -> Result<(), CapabilityError> {
        Ok(())
    }
}

/// Delivers a fake capability instead of running the subprocess bootstrap,
/// counting how many times the bootstrap would have run.
struct FakeInstaller {
    receiver: Arc<Receiver>,
    outcome: AtomicBool,
    bootstraps: AtomicUsize,
}

impl FakeInstaller {
    fn new(receiver: Arc<Receiver>) -> Arc<Self> {
        Arc::new(Self {
            receiver,
            outcome: AtomicBool::new(true),
            bootstraps: AtomicUsize::new(0),
        })
    }

    fn fail_next(&self) {
        self.outcome.store(false, Ordering::SeqCst);
    }

    fn succeed_next(&self) {
        self.outcome.store(true, Ordering::SeqCst);
    }

    fn bootstraps(&self) -> usize {
        self.bootstraps.load(Ordering::SeqCst)
    }
}

impl Installer for FakeInstaller {
    fn install(&self) -> bool {
        if self.receiver.is_loaded() {
            return true;
        }
        self.bootstraps.fetch_add(1, Ordering::SeqCst);
        if !self.outcome.load(Ordering::SeqCst) {
            return false;
        }
        self.receiver
            .deliver(None, Some(Arc::new(FakeCapability) as CapabilityHandle));
        true
    }
}

struct Fixture {
    broker: Broker,
    installer: Arc<FakeInstaller>,
}

fn fixture(resolver: FixedResolver) -> Fixture {
    let receiver = Arc::new(Receiver::new());
    let installer = FakeInstaller::new(receiver.clone());
    let broker = Broker::new(receiver, installer.clone(), Arc::new(resolver));
    Fixture { broker, installer }
}

fn id(ident: &str) -> CallerId {
    CallerId::new(ident)
}

// Fresh process, plain install from a single call site.
#[test]
fn fresh_install_round_trip() {
    let Fixture { broker, installer } = fixture(FixedResolver::caller("app::profiler"));

    assert!(!broker.is_installed());
    assert!(broker.install().unwrap());
    assert!(broker.is_installed());
    assert_eq!(installer.bootstraps(), 1);

    let handle = broker.capability().unwrap();
    assert_eq!(
        handle.loaded_units(),
        vec!["alpha".to_string(), "beta".to_string()]
    );
}

// Installer layer: a second install is a no-op success that never
// re-runs the bootstrap. (The broker layer raises a state error instead;
// both behaviors are pinned here.)
#[test]
fn install_is_idempotent_at_the_installer() {
    let Fixture { broker, installer } = fixture(FixedResolver::caller("app::profiler"));

    assert!(broker.install().unwrap());
    assert!(installer.install());
    assert!(installer.install());
    assert_eq!(installer.bootstraps(), 1);

    assert!(matches!(broker.install(), Err(Error::AlreadyInstalled)));
    assert_eq!(installer.bootstraps(), 1);
}

// A caller that never installed stays locked out even though someone
// else installed successfully.
#[test]
fn unrelated_caller_is_denied() {
    let Fixture { broker, .. } = fixture(FixedResolver::caller("app::profiler"));
    assert!(broker.install().unwrap());

    let denied = broker.capability_as(Some(id("other::module")));
    assert!(matches!(denied, Err(Error::CallerDenied(_))));
}

// Explicit extras are usable and only an explicit revoke removes them.
#[test]
fn explicit_whitelist_entries_persist() {
    let Fixture { broker, .. } = fixture(FixedResolver::caller("app::profiler"));
    assert!(
        broker
            .install_with(&[id("ext::a"), id("ext::b")])
            .unwrap()
    );

    assert!(broker.capability_as(Some(id("ext::a"))).is_ok());
    assert!(broker.capability_as(Some(id("ext::b"))).is_ok());
    assert!(broker.is_authorized(&id("app::profiler")));

    assert!(broker.revoke(&id("ext::b")));
    assert!(!broker.is_authorized(&id("ext::b")));
    assert!(matches!(
        broker.capability_as(Some(id("ext::b"))),
        Err(Error::CallerDenied(_))
    ));
    assert!(broker.capability_as(Some(id("ext::a"))).is_ok());
}

#[test]
fn empty_whitelist_entry_fails_before_any_mutation() {
    let Fixture { broker, installer } = fixture(FixedResolver::caller("app::profiler"));

    let result = broker.install_with(&[id("ext::a"), id("")]);
    assert!(matches!(result, Err(Error::EmptyCallerId)));
    assert_eq!(installer.bootstraps(), 0);
    assert!(!broker.is_installed());
    assert!(!broker.is_authorized(&id("ext::a")));
}

// Every privileged operation is a state error before install.
#[test]
fn privileged_operations_require_install() {
    let Fixture { broker, .. } = fixture(FixedResolver::caller("app::profiler"));

    assert!(matches!(broker.capability(), Err(Error::NotInstalled)));
    assert!(matches!(
        broker.object_footprint("alpha"),
        Err(Error::NotInstalled)
    ));
    assert!(matches!(broker.loaded_units(), Err(Error::NotInstalled)));
    assert!(matches!(
        broker.redefine_unit("alpha", &[0x90]),
        Err(Error::NotInstalled)
    ));
    assert!(matches!(
        broker.supports_redefine(),
        Err(Error::NotInstalled)
    ));
    assert!(matches!(
        broker.adjust_module_visibility("alpha", &ModuleEdits::default()),
        Err(Error::NotInstalled)
    ));
}

// A failed bootstrap reports false, leaves nothing installed,
// and a later attempt re-runs the whole bootstrap.
#[test]
fn failed_bootstrap_leaves_state_untouched_and_is_retryable() {
    let Fixture { broker, installer } = fixture(FixedResolver::caller("app::profiler"));
    installer.fail_next();

    assert!(!broker.install().unwrap());
    assert!(!broker.is_installed());
    assert!(!broker.is_authorized(&id("app::profiler")));
    assert_eq!(installer.bootstraps(), 1);

    installer.succeed_next();
    assert!(broker.install().unwrap());
    assert_eq!(installer.bootstraps(), 2);
    assert!(broker.capability().is_ok());
}

// On an installed process, the unrelated caller's failure is an
// authorization error, not a state error.
#[test]
fn denied_access_is_distinguishable_from_not_installed() {
    let Fixture { broker, .. } = fixture(FixedResolver::caller("app::profiler"));
    assert!(broker.install().unwrap());

    match broker.capability_as(Some(id("other::module"))) {
        Err(Error::CallerDenied(caller)) => assert_eq!(caller.as_str(), "other::module"),
        other => panic!("expected CallerDenied, got {other:?}"),
    }
}

#[test]
fn unresolved_caller_cannot_read_the_capability() {
    let Fixture { broker, .. } = fixture(FixedResolver::unresolved());

    // First install without an identity is tolerated (restricted
    // environments), but the whitelist then only grows by explicit extras.
    assert!(broker.install_with(&[id("ext::a")]).unwrap());
    assert!(matches!(broker.capability(), Err(Error::CallerUnresolved)));
    assert!(broker.capability_as(Some(id("ext::a"))).is_ok());
}

// Delegated failures pass through unchanged once the caller is authorized.
#[test]
fn delegated_failures_pass_through() {
    let Fixture { broker, .. } = fixture(FixedResolver::caller("app::profiler"));
    assert!(broker.install().unwrap());

    assert_eq!(broker.object_footprint("alpha").unwrap(), 64);
    assert!(matches!(
        broker.object_footprint("missing"),
        Err(Error::Capability(CapabilityError::UnitNotFound(_)))
    ));
    assert!(matches!(
        broker.redefine_unit("locked", &[0x90]),
        Err(Error::Capability(CapabilityError::UnitNotModifiable(_)))
    ));
    assert!(!broker.is_redefinable("locked").unwrap());
    assert!(broker.supports_retransform().unwrap());
    assert!(!broker.supports_call_prefix().unwrap());
}

// The not-installed pre-check runs before the whitelist lock is taken.
// The consequence is pinned rather than fixed: two racing installs can both
// report success while the bootstrap runs only once, and both callers end
// up whitelisted.
#[test]
fn install_race_double_success_single_bootstrap() {
    let receiver = Arc::new(Receiver::new());
    let installer = FakeInstaller::new(receiver.clone());
    let broker = Arc::new(Broker::new(
        receiver,
        installer.clone(),
        Arc::new(FixedResolver::unresolved()),
    ));

    let results: Vec<_> = std::thread::scope(|scope| {
        let handles: Vec<_> = ["racer::a", "racer::b"]
            .into_iter()
            .map(|ident| {
                let broker = broker.clone();
                scope.spawn(move || broker.install_as(Some(id(ident)), &[]))
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    assert_eq!(installer.bootstraps(), 1);
    for result in results {
        // Either both pass the pre-check (double success) or the loser hits
        // the state error; both outcomes leave a consistent installed state.
        match result {
            Ok(true) => {}
            Err(Error::AlreadyInstalled) => {}
            other => panic!("unexpected race outcome: {other:?}"),
        }
    }
    assert!(broker.is_installed());
}
