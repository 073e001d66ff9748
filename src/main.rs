#![cfg_attr(all(target_arch = "aarch64", target_os = "none"), no_std)]
#![cfg_attr(all(target_arch = "aarch64", target_os = "none"), no_main)]

#[cfg(all(target_arch = "aarch64", target_os = "none"))]
mod boot {
    use core::panic::PanicInfo;

    use sbsa_acs::arch::aarch64::psci;
    use sbsa_acs::arch::aarch64::BareMetal;
    use sbsa_acs::info::InfoTables;
    use sbsa_acs::mm::BumpAllocator;
    use sbsa_acs::probe::{OverrideProbe, PlatformProbe};
    use sbsa_acs::{logger, platform, println, run_suite, StatusRegistry, SuiteConfig};

    static REGISTRY: StatusRegistry = StatusRegistry::new();

    const BOOT_STACK_SIZE: usize = 64 * 1024;

    #[repr(C, align(16))]
    struct BootStack(core::cell::UnsafeCell<[u8; BOOT_STACK_SIZE]>);

    // Only touched through sp by the boot PE.
    unsafe impl Sync for BootStack {}

    #[no_mangle]
    static ACS_BOOT_STACK: BootStack = BootStack(core::cell::UnsafeCell::new([0; BOOT_STACK_SIZE]));

    // The affinity test in `_start` is Aff3 | Aff2..Aff0.
    const _: () = assert!(sbsa_acs::arch::aarch64::defs::MPIDR_AFFINITY_MASK == 0xFF_00FF_FFFF);

    // Only the PE with affinity 0.0.0.0 runs the suite, whatever firmware
    // released into the image; the others wait for CPU_ON.
    core::arch::global_asm!(
        r#"
.section .text.boot
.global _start
_start:
    // x0: device tree
    mrs     x1, mpidr_el1
    ubfx    x2, x1, #32, #8     // Aff3
    and     x1, x1, #0xffffff   // Aff2..Aff0
    orr     x1, x1, x2
    cbnz    x1, 2f
    adrp    x1, ACS_BOOT_STACK
    add     x1, x1, :lo12:ACS_BOOT_STACK
    mov     x2, #0x10000        // BOOT_STACK_SIZE
    add     sp, x1, x2
    bl      rust_main
2:  wfe
    b       2b
"#
    );

    fn run(probe: &dyn PlatformProbe) -> ! {
        let config = SuiteConfig::from_platform().normalized();

        // SAFETY: the arena region is reserved for the info tables and
        // nothing else maps it.
        let arena = unsafe {
            BumpAllocator::new(platform::TABLE_ARENA_BASE, platform::TABLE_ARENA_SIZE)
        };
        let mut tables = InfoTables::new(arena, platform::LIMITS);
        let report = run_suite(&config, &BareMetal, probe, &mut tables, &REGISTRY);

        println!("\n      Exit code {}", report.exit_code());
        psci::system_off()
    }

    /// Rust entry point called from the startup code, device tree in x0.
    #[no_mangle]
    pub extern "C" fn rust_main(dtb_addr: u64) -> ! {
        logger::init(SuiteConfig::from_platform().normalized().print_level());

        #[cfg(feature = "fdt-probe")]
        {
            use sbsa_acs::probe::FdtProbe;
            // SAFETY: firmware leaves the blob in place for the whole run.
            if let Some(fdt) = unsafe { FdtProbe::from_addr(dtb_addr as usize) } {
                run(&fdt);
            }
            log::warn!("no device tree at {:#x}, using the built-in platform description", dtb_addr);
        }
        #[cfg(not(feature = "fdt-probe"))]
        let _ = dtb_addr;

        run(&OverrideProbe)
    }

    #[panic_handler]
    fn panic(info: &PanicInfo) -> ! {
        sbsa_acs::uart::write_fmt_nowait(format_args!("\n!!! PANIC !!!\n{}\n", info));
        loop {
            // SAFETY: wfe only idles the PE.
            unsafe { core::arch::asm!("wfe") };
        }
    }
}

#[cfg(not(all(target_arch = "aarch64", target_os = "none")))]
fn main() {
    eprintln!("sbsa-acs runs on bare-metal aarch64 only");
}
